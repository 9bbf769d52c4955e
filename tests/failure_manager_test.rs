//! Integration tests for guarded regions run through a `FailureManager`

use gizmos::{
    DifferentError, Error, ErrorFilter, ErrorKind, FailureHandler, FailureManager, Fallback,
    Suppress,
};

fn parse(input: &str) -> Result<i64, Error> {
    input
        .parse::<i64>()
        .map_err(|e| Error::custom("ParseIntError", e.to_string()))
}

#[test]
fn test_suppress_then_fallback_on_parse_failures() {
    let mut manager = FailureManager::builder()
        .handler(Suppress::new())
        .handler(Fallback::named("zero", || Ok::<_, Error>(0_i64)))
        .watch(ErrorFilter::named("ParseIntError"))
        .assign_priorities(true)
        .build()
        .unwrap();
    assert_eq!(manager.priorities(), vec![1, 2]);

    assert_eq!(manager.run(|| parse("42")).unwrap(), Some(42));
    assert_eq!(manager.run(|| parse("forty-two")).unwrap(), None);

    let fallback = manager.handler::<Fallback<i64>>(2).unwrap();
    assert_eq!(fallback.returned(), Some(&0));
    assert_eq!(manager.caught().len(), 1);
    assert_eq!(manager.caught()[0].name(), "ParseIntError");
}

#[test]
fn test_different_error_replaces_watched_error() {
    let mut manager = FailureManager::builder()
        .handler(DifferentError::new("ConfigError", "bad value: {value}").unwrap())
        .watch(ErrorKind::Custom)
        .build()
        .unwrap();

    let err = manager.run(|| parse("x")).unwrap_err();
    assert_eq!(err.name(), "ConfigError");
    assert!(err.to_string().contains("bad value"));
    assert!(err.to_string().contains("invalid digit"));
    assert_eq!(manager.caught().len(), 1);
}

#[test]
fn test_unwatched_errors_pass_through_untouched() {
    let mut manager = FailureManager::builder()
        .handler(Suppress::new())
        .watch(ErrorKind::Timeout)
        .build()
        .unwrap();

    let err = manager
        .run(|| Err::<(), _>(Error::configuration("missing key")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(manager.caught().is_empty());
}

#[test]
fn test_deactivated_handlers_are_skipped() {
    let mut manager = FailureManager::builder()
        .handler(DifferentError::named("Replaced").unwrap())
        .build()
        .unwrap();
    manager
        .handler_mut::<DifferentError>(1)
        .unwrap()
        .set_activated(false);

    assert_eq!(manager.run(|| parse("?")).unwrap(), None);
}

#[test]
fn test_wrapped_function_reuses_the_manager() {
    let mut manager = FailureManager::builder()
        .handler(Suppress::new())
        .build()
        .unwrap();

    {
        let mut guarded = manager.wrap(|input: String| parse(&input));
        assert_eq!(guarded("1".to_owned()).unwrap(), Some(1));
        assert_eq!(guarded("two".to_owned()).unwrap(), None);
        assert_eq!(guarded("three".to_owned()).unwrap(), None);
    }
    assert_eq!(manager.caught().len(), 2);
}

#[tokio::test]
async fn test_async_region() {
    let mut manager = FailureManager::builder()
        .handler(Suppress::new())
        .build()
        .unwrap();

    let value = manager
        .run_async(async { Err::<u8, _>(Error::custom("IoError", "reset")) })
        .await
        .unwrap();
    assert_eq!(value, None);

    let value = manager.run_async(async { Ok::<_, Error>(3_u8) }).await.unwrap();
    assert_eq!(value, Some(3));
}

#[test]
fn test_anyhow_errors_are_watched_by_name() {
    let mut manager = FailureManager::builder()
        .handler(Suppress::new())
        .watch(ErrorFilter::named("anyhow::Error"))
        .build()
        .unwrap();

    let value = manager
        .run(|| -> anyhow::Result<u8> { Err(anyhow::anyhow!("socket closed")) })
        .unwrap();
    assert_eq!(value, None);
    assert!(manager.caught()[0].message().contains("socket closed"));
}
