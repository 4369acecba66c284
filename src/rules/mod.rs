//! Declarative rule tables and the rule-based scorers built on them

pub mod behavioral;
pub mod signatures;
pub mod transaction;

pub use behavioral::{BehavioralRuleConfig, BehavioralRules};
pub use signatures::{AmountSignatureTable, SignatureRegistry, SignatureRule};
pub use transaction::{KeywordTier, NarrationMatch, TransactionRuleConfig, TransactionRules};
