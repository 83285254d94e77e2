pub const ERRCTX_DATA: &'static str = "in data section";
pub const ERRCTX_COMMENT: &'static str = "in comment";
pub const ERRCTX_CDATA_SECTION: &'static str = "in CDATA section";
pub const ERRCTX_PI: &'static str = "in processing instruction";

/// Pick the error context matching a data section terminator.
pub fn for_delimiter(delimiter: &str) -> &'static str {
	match delimiter {
		"-->" => ERRCTX_COMMENT,
		"]]>" => ERRCTX_CDATA_SECTION,
		"?>" => ERRCTX_PI,
		_ => ERRCTX_DATA,
	}
}
