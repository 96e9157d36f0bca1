//! The stratus reconciler daemon.
//!
//! A fixed-interval control loop keeps the platform database in sync with the
//! workflow engine: for every resource kind with an operation in flight, the
//! stored status follows the run's phase. On top of that sit two cycle steps
//! with side effects of their own: the bootstrap watcher that starts
//! installation of agent-registered clusters, and the rule distributor that
//! pushes pending alerting rules into each organization's monitoring stack.

pub mod bootstrap;
pub mod config;
pub mod observability;
pub mod platform;
pub mod reconcile;
pub mod rules;
pub mod scheduler;
