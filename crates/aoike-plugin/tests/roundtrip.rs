use aoike_plugin::{AoikePlugin, Plugin};
use proptest::prelude::*;

fn default_export(code: &str) -> String {
    let literal = code
        .strip_prefix("export default ")
        .and_then(|rest| rest.strip_suffix(';'))
        .expect("module should be a single default export");
    serde_json::from_str(literal).expect("export should be a JSON string literal")
}

proptest! {
    #[test]
    fn markdown_module_exports_original_text(source in any::<String>()) {
        let result = AoikePlugin::new().transform(&source, "x.md").unwrap();

        let result = result.expect("`.md` ids are always transformed");
        prop_assert_eq!(default_export(&result.code), source);
    }

    #[test]
    fn quotes_and_backslashes_survive(source in r#"[\\"'\n\r\t\u{0}-\u{1f}a-zé中😀]{0,64}"#) {
        let result = AoikePlugin::new().transform(&source, "notes/q.md").unwrap().unwrap();

        prop_assert_eq!(default_export(&result.code), source);
    }

    #[test]
    fn other_suffixes_pass_through(stem in "[a-z]{1,8}", ext in "(vue|ts|MD|Md|mdx|markdown|js)") {
        let id = format!("{}.{}", stem, ext);

        prop_assert!(AoikePlugin::new().transform("# hi", &id).unwrap().is_none());
    }
}
