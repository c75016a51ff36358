/*!
 * Tests for language tag utilities
 */

use ytsubflow::language_utils::{
    default_track_name, display_name, get_language_name, primary_subtag, validate_language_tag,
};

#[test]
fn test_validate_language_tag_withRegionSubtag_shouldCheckPrimaryOnly() {
    assert!(validate_language_tag("pt-BR").is_ok());
    assert!(validate_language_tag("te").is_ok());
    assert!(validate_language_tag("zz-BR").is_err());
}

#[test]
fn test_get_language_name_withKnownTags_shouldReturnEnglishNames() {
    assert_eq!(get_language_name("te").unwrap(), "Telugu");
    assert_eq!(get_language_name("hi").unwrap(), "Hindi");
    assert_eq!(get_language_name("EN-us").unwrap(), "English");
    assert!(get_language_name("qq").is_err());
}

#[test]
fn test_display_name_withUnknownTag_shouldFallBackToTag() {
    assert_eq!(display_name(" qq "), "qq");
    assert_eq!(primary_subtag(" ta-IN "), "ta");
}

#[test]
fn test_default_track_name_withTamil_shouldCombineNames() {
    assert_eq!(default_track_name("ta", "en"), "Tamil + English Meaning");
}
