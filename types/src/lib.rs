#![cfg_attr(not(feature = "std"), no_std)]

pub mod coin;
pub mod hex_serde;
pub mod key;
pub mod payment_proof;
pub mod receiver;
pub mod sig_pub_key;
pub mod tx_random;

pub use coin::{Coin, MAX_SIZE_INFO_COIN};
pub use key::{KeySet, OtaKey, PaymentAddress, PaymentInfo, ViewingKey};
pub use payment_proof::PaymentProof;
pub use receiver::OtaReceiver;
pub use sig_pub_key::SigPubKey;
pub use tx_random::TxRandom;
