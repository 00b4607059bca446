pub const OK: i32 = 0;
/// At least one cell failed to parse, validate, or reach its provider.
pub const EVAL_FAILURES: i32 = 1;
pub const CONFIG_ERROR: i32 = 2;
