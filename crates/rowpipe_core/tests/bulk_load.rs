use rowpipe_core::{
    ErrorKind, HandleCounts, LoadFailure, LoadReport, NewUser, PipelineConfig, RepoError,
    SourceError, SourceResult, UserPipeline,
};
use std::collections::HashSet;
use tempfile::TempDir;
use uuid::Uuid;

#[test]
fn load_inserts_every_record_with_fresh_ids() {
    let (_dir, pipeline) = bootstrapped_pipeline();
    let source = vec![
        Ok(NewUser::new("Ada", "ada@example.com", 36)),
        Ok(NewUser::new("Bob", "bob@example.com", 41)),
        Ok(NewUser::new("Ada", "ada@example.com", 36)),
    ];

    let report = pipeline.load(source).unwrap();
    assert_eq!(
        report,
        LoadReport {
            read: 3,
            inserted: 3,
            skipped_duplicates: 0,
        }
    );

    let ids: HashSet<Uuid> = pipeline
        .stream_rows(|rows| rows.map(|user| user.unwrap().user_id).collect())
        .unwrap();
    assert_eq!(ids.len(), 3);
    assert_eq!(pipeline.open_handles(), HandleCounts::default());
}

#[test]
fn reloading_known_ids_is_idempotent() {
    let (_dir, pipeline) = bootstrapped_pipeline();
    let ada = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let source = || -> Vec<SourceResult<NewUser>> {
        vec![
            Ok(NewUser::with_id(ada, "Ada", "ada@example.com", 36)),
            Ok(NewUser::with_id(bob, "Bob", "bob@example.com", 41)),
        ]
    };

    pipeline.load(source()).unwrap();
    let report = pipeline.load(source()).unwrap();

    assert_eq!(report.read, 2);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.skipped_duplicates, 2);
    assert_eq!(pipeline.count_rows().unwrap(), 2);
}

#[test]
fn duplicate_id_keeps_first_row() {
    let (_dir, pipeline) = bootstrapped_pipeline();
    let id = Uuid::new_v4();
    let source = vec![
        Ok(NewUser::with_id(id, "First", "first@example.com", 20)),
        Ok(NewUser::with_id(id, "Second", "second@example.com", 30)),
    ];

    let report = pipeline.load(source).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped_duplicates, 1);

    let page = pipeline.fetch_page(10, 0).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "First");
    assert_eq!(page[0].age, 20);
}

#[test]
fn source_error_rolls_back_whole_load() {
    let (_dir, pipeline) = bootstrapped_pipeline();
    pipeline
        .load(vec![Ok(NewUser::new("Kept", "kept@example.com", 50))])
        .unwrap();

    let source: Vec<SourceResult<NewUser>> = vec![
        Ok(NewUser::new("Ada", "ada@example.com", 36)),
        Ok(NewUser::new("Bob", "bob@example.com", 41)),
        Err(SourceError::MissingHeader("age")),
        Ok(NewUser::new("Eve", "eve@example.com", 29)),
    ];
    let err = pipeline.load(source).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Load);
    match err {
        RepoError::Load { record, cause } => {
            assert_eq!(record, 3);
            assert!(matches!(cause, LoadFailure::Source(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(pipeline.count_rows().unwrap(), 1);
    assert_eq!(pipeline.open_handles(), HandleCounts::default());
}

#[test]
fn empty_text_fields_are_stored_as_given() {
    let (_dir, pipeline) = bootstrapped_pipeline();
    let source = vec![
        Ok(NewUser::new("Ada", "ada@example.com", 30)),
        Ok(NewUser::new("Ann", "", 40)),
        Ok(NewUser::new("", "anon@example.com", 0)),
    ];

    let report = pipeline.load(source).unwrap();
    assert_eq!(report.inserted, 3);

    let page = pipeline.fetch_page(10, 0).unwrap();
    assert!(page.iter().any(|user| user.name == "Ann" && user.email.is_empty()));
    assert!(page.iter().any(|user| user.name.is_empty() && user.age == 0));
}

#[test]
fn store_aborted_transaction_still_reports_failing_record() {
    let (dir, pipeline) = bootstrapped_pipeline();
    rusqlite::Connection::open(dir.path().join("users.db"))
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_carol BEFORE INSERT ON user_data
             WHEN NEW.name = 'Carol'
             BEGIN
                 SELECT RAISE(ROLLBACK, 'carol rejected');
             END;",
        )
        .unwrap();

    let source = vec![
        Ok(NewUser::new("Ada", "ada@example.com", 36)),
        Ok(NewUser::new("Carol", "carol@example.com", 52)),
        Ok(NewUser::new("Dan", "dan@example.com", 19)),
    ];
    let err = pipeline.load(source).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Load);
    match err {
        RepoError::Load {
            record,
            cause: LoadFailure::Store(store),
        } => {
            assert_eq!(record, 2);
            assert!(store.to_string().contains("carol rejected"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(pipeline.count_rows().unwrap(), 0);
    assert_eq!(pipeline.open_handles(), HandleCounts::default());
}

#[test]
fn load_before_bootstrap_fails_without_creating_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE unrelated (x INTEGER);")
        .unwrap();
    let pipeline = UserPipeline::new(PipelineConfig::new(&path)).unwrap();

    let err = pipeline
        .load(vec![Ok(NewUser::new("Ada", "ada@example.com", 36))])
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Load {
            record: 1,
            cause: LoadFailure::Store(_)
        }
    ));
}

#[test]
fn load_csv_file_reads_header_described_rows() {
    let (dir, pipeline) = bootstrapped_pipeline();
    let csv = dir.path().join("user_data.csv");
    std::fs::write(
        &csv,
        "name,email,age\n\
         Dan Altenwerth Jr.,Molly59@gmail.com,67\n\
         Glenda Wisozk,Miriam21@gmail.com,119\n\
         Daniel Fahey IV,Delia.Lesch11@hotmail.com,49\n",
    )
    .unwrap();

    let report = pipeline.load_csv_file(&csv).unwrap();
    assert_eq!(report.inserted, 3);

    let mut ages: Vec<u32> = pipeline
        .stream_ages(|ages| ages.map(Result::unwrap).collect())
        .unwrap();
    ages.sort_unstable();
    assert_eq!(ages, vec![49, 67, 119]);
}

#[test]
fn load_csv_file_rounds_fractional_ages() {
    let (dir, pipeline) = bootstrapped_pipeline();
    let csv = dir.path().join("fractional.csv");
    std::fs::write(&csv, "name,email,age\nAda,ada@x.io,36\nBob,bob@x.io,30.5\n").unwrap();

    let report = pipeline.load_csv_file(&csv).unwrap();
    assert_eq!(report.inserted, 2);

    let mut ages: Vec<u32> = pipeline
        .stream_ages(|ages| ages.map(Result::unwrap).collect())
        .unwrap();
    ages.sort_unstable();
    assert_eq!(ages, vec![31, 36]);
}

#[test]
fn reloading_csv_with_user_ids_skips_existing_rows() {
    let (dir, pipeline) = bootstrapped_pipeline();
    let ada = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let csv = dir.path().join("keyed.csv");
    std::fs::write(
        &csv,
        format!("user_id,name,email,age\n{ada},Ada,ada@x.io,36\n{bob},Bob,bob@x.io,41\n"),
    )
    .unwrap();

    let first = pipeline.load_csv_file(&csv).unwrap();
    assert_eq!(first.inserted, 2);

    let second = pipeline.load_csv_file(&csv).unwrap();
    assert_eq!(
        second,
        LoadReport {
            read: 2,
            inserted: 0,
            skipped_duplicates: 2,
        }
    );
    assert_eq!(pipeline.count_rows().unwrap(), 2);

    let ids: HashSet<Uuid> = pipeline
        .stream_rows(|rows| rows.map(|user| user.unwrap().user_id).collect())
        .unwrap();
    assert_eq!(ids, HashSet::from([ada, bob]));
}

#[test]
fn load_csv_file_with_bad_row_commits_nothing() {
    let (dir, pipeline) = bootstrapped_pipeline();
    let csv = dir.path().join("broken.csv");
    std::fs::write(&csv, "name,email,age\nAda,ada@x.io,36\nBob,bob@x.io,old\n").unwrap();

    let err = pipeline.load_csv_file(&csv).unwrap_err();
    assert!(matches!(err, RepoError::Load { record: 2, .. }));
    assert_eq!(pipeline.count_rows().unwrap(), 0);
}

#[test]
fn load_csv_file_missing_file_fails_before_touching_store() {
    let (dir, pipeline) = bootstrapped_pipeline();

    let err = pipeline
        .load_csv_file(dir.path().join("missing.csv"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Load {
            record: 0,
            cause: LoadFailure::Source(SourceError::Io { .. })
        }
    ));
    assert_eq!(pipeline.open_handles(), HandleCounts::default());
}

fn bootstrapped_pipeline() -> (TempDir, UserPipeline) {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = UserPipeline::new(PipelineConfig::new(dir.path().join("users.db"))).unwrap();
    pipeline.bootstrap().unwrap();
    (dir, pipeline)
}
