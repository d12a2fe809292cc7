//! Helpers for tests of this crate and of crates that build on it. Enabled by the `test_utils` feature.
pub mod fixtures;
pub mod mock_gateway;
pub mod prepare_env;

pub use fixtures::{add_member, fund_central_wallet, fund_mgr, fund_savings, seed_chama, TestChama};
pub use mock_gateway::MockGateway;
pub use prepare_env::{new_test_database, prepare_test_env, random_db_path};
