// Fit-score orchestration: the tiered fallback client, the shared
// resilience primitives, and the background corpus recompute.
// All AI-service calls go through ai_client — no direct HTTP here.

pub mod background;
pub mod client;
pub mod handlers;
pub mod health;
pub mod heuristic;
pub mod retry;
