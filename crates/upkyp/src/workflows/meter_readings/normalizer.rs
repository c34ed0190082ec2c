/// Canonical unit label: invisible characters stripped, whitespace collapsed, upper-cased.
pub(crate) fn normalize_unit(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_ascii_uppercase()
}
