//! Executor tests against the in-memory dance server
