// ============================================================
// Layer 2 — Application
// ============================================================
// Coordinates the other layers to answer questions.
//
// Rules for this layer:
//   - No span math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct file access beyond reading a config file
//   - Only workflow coordination and input validation
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Reader settings and per-call overrides
pub mod config;

// The warm-up / run workflow
pub mod reader;
