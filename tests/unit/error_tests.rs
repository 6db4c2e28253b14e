// Error taxonomy: every variant maps to one status, one label and one kind

use inkmark::error::RenderError;

fn all_variants() -> Vec<RenderError> {
    vec![
        RenderError::Unauthorized("missing".into()),
        RenderError::MethodNotAllowed("PUT".into()),
        RenderError::BadRequest("bucket missing".into()),
        RenderError::NotFound("File 'a.pdf' not found in bucket 'docs'".into()),
        RenderError::PayloadTooLarge { size: 2, max: 1 },
        RenderError::InvalidRange("start > end".into()),
        RenderError::RangeTooLarge {
            start: 1,
            end: 60,
            requested: 60,
            max: 50,
        },
        RenderError::DocumentTooLarge { pages: 885, max: 200 },
        RenderError::Processing("decode failed".into()),
        RenderError::PdfSaveFailed("io".into()),
        RenderError::StoreUnavailable("timeout".into()),
        RenderError::Configuration("no secret".into()),
    ]
}

#[test]
fn test_status_codes_partition_client_and_server_errors() {
    let statuses: Vec<u16> = all_variants().iter().map(RenderError::status_code).collect();
    assert_eq!(
        statuses,
        vec![401, 405, 400, 404, 400, 400, 400, 400, 500, 500, 500, 500]
    );
}

#[test]
fn test_kinds_are_unique() {
    let mut kinds: Vec<&str> = all_variants().iter().map(RenderError::kind).collect();
    let total = kinds.len();
    kinds.sort_unstable();
    kinds.dedup();
    assert_eq!(kinds.len(), total);
}

#[test]
fn test_labels_are_non_empty() {
    for err in all_variants() {
        assert!(!err.label().is_empty(), "{:?}", err);
        assert!(!err.to_string().is_empty(), "{:?}", err);
    }
}

#[test]
fn test_ceiling_messages_guide_the_caller() {
    let err = RenderError::DocumentTooLarge { pages: 885, max: 200 };
    let message = err.to_string();
    assert!(message.contains("885"));
    assert!(message.contains("start and end"));

    let err = RenderError::RangeTooLarge {
        start: 1,
        end: 60,
        requested: 60,
        max: 50,
    };
    assert!(err.to_string().contains("(1-60)"));
}
