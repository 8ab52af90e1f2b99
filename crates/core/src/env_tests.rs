// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serial_test::serial;

use super::*;

fn clear(key: &str) {
    std::env::remove_var(format!("{ENV_PREFIX}{key}"));
    std::env::remove_var(format!("{LEGACY_ENV_PREFIX}{key}"));
}

#[test]
#[serial]
fn new_prefix_wins_over_legacy() {
    clear("SPEC_A");
    std::env::set_var("OPENWORK_SPEC_A", "new");
    std::env::set_var("OPENCODE_STUDIO_SPEC_A", "old");
    assert_eq!(var("SPEC_A").as_deref(), Some("new"));
    clear("SPEC_A");
}

#[test]
#[serial]
fn legacy_prefix_is_a_fallback() {
    clear("SPEC_B");
    reset_warned();
    std::env::set_var("OPENCODE_STUDIO_SPEC_B", "old");
    assert_eq!(var("SPEC_B").as_deref(), Some("old"));
    clear("SPEC_B");
}

#[test]
#[serial]
fn empty_values_are_unset() {
    clear("SPEC_C");
    std::env::set_var("OPENWORK_SPEC_C", "");
    assert_eq!(var("SPEC_C"), None);
    clear("SPEC_C");
}

#[test]
#[serial]
fn flags_parse_common_spellings() {
    clear("SPEC_D");
    for (raw, expected) in
        [("1", Some(true)), ("true", Some(true)), ("off", Some(false)), ("maybe", None)]
    {
        std::env::set_var("OPENWORK_SPEC_D", raw);
        assert_eq!(flag("SPEC_D"), expected, "raw = {raw:?}");
    }
    clear("SPEC_D");
}

#[test]
#[serial]
fn parsed_ignores_garbage() {
    clear("SPEC_E");
    std::env::set_var("OPENWORK_SPEC_E", "not-a-number");
    assert_eq!(var_parsed::<u16>("SPEC_E"), None);
    std::env::set_var("OPENWORK_SPEC_E", "8100");
    assert_eq!(var_parsed::<u16>("SPEC_E"), Some(8100));
    clear("SPEC_E");
}

#[test]
#[serial]
fn data_dir_prefers_explicit_override() {
    clear("DATA_DIR");
    std::env::set_var("OPENWORK_DATA_DIR", "/tmp/ow-data");
    assert_eq!(data_dir().unwrap(), PathBuf::from("/tmp/ow-data"));
    clear("DATA_DIR");
}
