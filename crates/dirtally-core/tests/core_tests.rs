use dirtally_core::path::{base_name, is_share, path_depth, share_to_abs};
use dirtally_core::{
    CompiledOptions, DEFAULT_BUFFER_SIZE, DirectoryAggregate, Entry, EntryMetadata, TimeFilter,
    TimeOperator, TraversalOptions, WalkError, filter_key,
};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[test]
fn test_options_builder() {
    let options = TraversalOptions::builder()
        .match_patterns(vec!["\\.rs$".to_string()])
        .ignore_patterns(vec!["^target".to_string()])
        .recurse(true)
        .max_depth(4usize)
        .err_skip(true)
        .concurrency(2usize)
        .build()
        .unwrap();

    assert_eq!(options.match_patterns.len(), 1);
    assert_eq!(options.ignore_patterns.len(), 1);
    assert!(options.recurse);
    assert_eq!(options.depth_limit(), Some(4));
    assert!(options.err_skip);
    assert_eq!(options.concurrency, 2);
    assert_eq!(options.buffer_size, DEFAULT_BUFFER_SIZE);

    // Test default options
    let default_options = TraversalOptions::default();
    assert!(!default_options.recurse);
    assert_eq!(default_options.depth_limit(), Some(1));
    assert!(!default_options.include_root);
    assert!(default_options.time_filters.is_empty());
}

#[test]
fn test_options_from_json() {
    let json = r#"{
        "match_patterns": ["fuga"],
        "recurse": true,
        "time_filters": [{ "base": "2024-01-01T00:00:00Z", "operator": "after" }]
    }"#;

    let options: TraversalOptions = serde_json::from_str(json).unwrap();
    assert_eq!(options.match_patterns, vec!["fuga".to_string()]);
    assert!(options.recurse);
    assert_eq!(options.buffer_size, DEFAULT_BUFFER_SIZE);
    assert_eq!(options.time_filters.len(), 1);
    assert_eq!(options.time_filters[0].operator, TimeOperator::After);

    let bad = r#"{ "time_filters": [{ "base": "2024-01-01T00:00:00Z", "operator": "around" }] }"#;
    assert!(serde_json::from_str::<TraversalOptions>(bad).is_err());
}

#[test]
fn test_unsupported_time_operator() {
    let err = "around".parse::<TimeOperator>().unwrap_err();
    assert!(matches!(err, WalkError::UnsupportedTimeOperator { ref operator } if operator == "around"));

    let err = "around:2024-01-01T00:00:00Z"
        .parse::<TimeFilter>()
        .unwrap_err();
    assert!(matches!(err, WalkError::UnsupportedTimeOperator { .. }));

    let err = "after:yesterday".parse::<TimeFilter>().unwrap_err();
    assert!(matches!(err, WalkError::InvalidTimeFilter { .. }));
}

#[test]
fn test_compiled_options_filter_order() {
    let base = UNIX_EPOCH + Duration::from_secs(1_000_000);
    let options = TraversalOptions {
        match_patterns: vec!["fuga".to_string()],
        ignore_patterns: vec!["hoge".to_string(), "fuga0$".to_string()],
        time_filters: vec![TimeFilter::new(base, TimeOperator::Before)],
        ..TraversalOptions::default()
    };
    let compiled = CompiledOptions::compile(&options).unwrap();

    let newer = EntryMetadata::file(1, base + Duration::from_secs(60));
    let older = EntryMetadata::file(1, base - Duration::from_secs(60));

    assert!(compiled.accepts("fuga1", &newer));
    assert!(!compiled.accepts("fuga1", &older));
    assert!(!compiled.accepts("fuga0", &newer));
    assert!(!compiled.accepts("hoge/fuga1", &newer));
    assert!(!compiled.accepts("piyo", &newer));
}

#[test]
fn test_compiled_options_depth() {
    let bounded = CompiledOptions::compile(&TraversalOptions::default()).unwrap();
    assert!(bounded.descends_into(0));
    assert!(!bounded.descends_into(1));

    let unbounded = CompiledOptions::compile(&TraversalOptions::recursive()).unwrap();
    assert_eq!(unbounded.depth_limit(), None);
    assert!(unbounded.descends_into(1_000));
}

#[test]
fn test_compile_rejects_bad_input() {
    let bad_pattern = TraversalOptions {
        match_patterns: vec!["[a-".to_string()],
        ..TraversalOptions::default()
    };
    let err = CompiledOptions::compile(&bad_pattern).unwrap_err();
    assert!(matches!(err, WalkError::InvalidPattern { ref pattern, .. } if pattern == "[a-"));

    let zero_buffer = TraversalOptions {
        buffer_size: 0,
        ..TraversalOptions::default()
    };
    assert!(matches!(
        CompiledOptions::compile(&zero_buffer),
        Err(WalkError::InvalidConfig { .. })
    ));
}

#[test]
fn test_filter_key() {
    let root = Path::new("/data");
    assert_eq!(filter_key(root, Path::new("/data/a/b")), Path::new("a/b").to_string_lossy());
    assert_eq!(filter_key(root, root), "/data");
}

#[test]
fn test_entry_properties() {
    let now = SystemTime::now();
    let entry = Entry::new("/tmp/report.txt", EntryMetadata::file(42, now), 2);

    assert_eq!(entry.name, "report.txt");
    assert!(entry.is_file());
    assert!(!entry.is_dir());
    assert_eq!(entry.size(), 42);
    assert!(!entry.has_error());

    let failed = Entry::failed(
        "/tmp/gone",
        1,
        WalkError::stat("/tmp/gone", std::io::Error::from(std::io::ErrorKind::NotFound)),
    );
    assert!(failed.has_error());
    assert!(!failed.is_file());
    assert_eq!(failed.size(), 0);
}

#[test]
fn test_aggregate_merge() {
    let mut parent = DirectoryAggregate::new("/root", 0);
    parent.record_file(10);
    parent.record_dir();

    let mut child = DirectoryAggregate::new("/root/sub", 1);
    child.record_file(5);
    child.record_file(7);
    child.record_dir();

    parent.merge(&child);

    assert_eq!(parent.size, 22);
    assert_eq!(parent.file_count, 3);
    assert_eq!(parent.dir_count, 2);
    assert_eq!(parent.total_items(), 5);

    let entry = child.to_entry();
    assert_eq!(entry.name, "sub");
    assert_eq!(entry.depth, 1);
}

#[test]
fn test_aggregate_serialization() {
    let mut aggregate = DirectoryAggregate::new("/root", 0);
    aggregate.record_file(3);
    aggregate.skipped.push(WalkError::list(
        "/root/locked",
        std::io::Error::from(std::io::ErrorKind::PermissionDenied),
    ));

    let value = serde_json::to_value(&aggregate).unwrap();
    assert_eq!(value["size"], 3);
    assert_eq!(value["file_count"], 1);
    assert!(value.get("error").is_none());
    assert!(value.get("children").is_none());
    assert!(value["skipped"][0].as_str().unwrap().contains("/root/locked"));
}

#[test]
fn test_path_utilities() {
    assert_eq!(base_name("/var/log/syslog.1"), "syslog");
    assert!(is_share("\\\\server\\share"));
    assert!(!is_share("C:\\dir"));
    assert_eq!(share_to_abs("\\\\server\\c$\\dir"), "c:\\dir");
    assert_eq!(path_depth("/a/b/c", Some('/')), 3);
}
