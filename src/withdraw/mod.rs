//! Withdrawal of residual record balances.
//!
//! # Data Flow
//! ```text
//! authority pubkey
//!     → Ledger::program_accounts_by_authority (memcmp on the authority field)
//!     → dry run: total + donation
//!     → live: per record [charity transfer] + withdraw_funds
//!     → SweepReport
//! ```

pub mod sweeper;

pub use sweeper::{CharityShare, RecordFailure, SweepReport, WithdrawError, WithdrawalSweeper};
