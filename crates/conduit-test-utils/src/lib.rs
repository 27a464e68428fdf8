pub mod chain;
pub mod helpers;
pub mod mock_bank;
pub mod mock_guardian;
pub mod mock_tokens;
pub mod recording_callback;

pub use chain::TestChain;
pub use helpers::*;
pub use mock_bank::MockBank;
pub use mock_guardian::MockGuardian;
pub use mock_tokens::MockTokenRegistry;
pub use recording_callback::RecordingCallback;
