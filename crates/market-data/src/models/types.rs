use std::borrow::Cow;

/// Provider identifier - mostly static constants
pub type ProviderId = Cow<'static, str>;

/// Symbol as supplied by the caller (e.g. "600519", "000001.SZ")
pub type SymbolCode = String;
