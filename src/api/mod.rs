// =============================================================================
// HTTP API — router and error mapping
// =============================================================================

pub mod rest;
