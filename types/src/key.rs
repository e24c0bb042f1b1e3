use std::fmt;
use std::str::FromStr;

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use privacy_crypto::operation::{
    hash_to_scalar, point_to_bytes, scalar_from_bytes, scalar_mult_base, POINT_SIZE,
};
use privacy_crypto::reader::ByteReader;
use privacy_crypto::{CryptoError, Result};

use crate::impl_hex_serde;

pub const PRIVATE_KEY_SIZE: usize = 32;
pub const PAYMENT_ADDRESS_SIZE: usize = 3 * POINT_SIZE;

const OTA_KEY_DOMAIN: &[u8] = b"onetimeaddress";

/// `PublicSpend || PublicView || PublicOTA`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentAddress {
    public_spend: RistrettoPoint,
    public_view: RistrettoPoint,
    public_ota: RistrettoPoint,
}

impl PaymentAddress {
    pub fn public_spend(&self) -> &RistrettoPoint {
        &self.public_spend
    }

    pub fn public_view(&self) -> &RistrettoPoint {
        &self.public_view
    }

    pub fn public_ota(&self) -> &RistrettoPoint {
        &self.public_ota
    }

    pub fn to_bytes(&self) -> [u8; PAYMENT_ADDRESS_SIZE] {
        let mut out = [0u8; PAYMENT_ADDRESS_SIZE];
        out[..32].copy_from_slice(&point_to_bytes(&self.public_spend));
        out[32..64].copy_from_slice(&point_to_bytes(&self.public_view));
        out[64..].copy_from_slice(&point_to_bytes(&self.public_ota));
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let address = Self {
            public_spend: reader.read_point("payment address spend key")?,
            public_view: reader.read_point("payment address view key")?,
            public_ota: reader.read_point("payment address ota key")?,
        };
        reader.finish("payment address")?;
        Ok(address)
    }
}

impl fmt::Display for PaymentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl FromStr for PaymentAddress {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| CryptoError::parse(format!("payment address hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

impl_hex_serde!(PaymentAddress);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewingKey {
    private_view: Scalar,
    public_spend: RistrettoPoint,
}

impl ViewingKey {
    pub fn private_view(&self) -> &Scalar {
        &self.private_view
    }

    pub fn public_view(&self) -> RistrettoPoint {
        scalar_mult_base(&self.private_view)
    }

    pub fn public_spend(&self) -> &RistrettoPoint {
        &self.public_spend
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtaKey {
    secret: Scalar,
    public_spend: RistrettoPoint,
}

impl OtaKey {
    pub fn secret(&self) -> &Scalar {
        &self.secret
    }

    pub fn public_spend(&self) -> &RistrettoPoint {
        &self.public_spend
    }
}

/// Every key is a pure function of the master private key. A scanning key
/// set holds the view and OTA keys without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    private_key: Option<Scalar>,
    payment_address: PaymentAddress,
    view_key: ViewingKey,
    ota_key: OtaKey,
}

impl KeySet {
    pub fn from_seed(seed: &[u8]) -> Self {
        Self::from_private_key(hash_to_scalar(seed))
    }

    pub fn from_private_key_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(CryptoError::invalid_input(format!(
                "private key must be {} bytes, got {}",
                PRIVATE_KEY_SIZE,
                bytes.len()
            )));
        }
        Ok(Self::from_private_key(scalar_from_bytes(bytes)?))
    }

    pub fn from_private_key(private_key: Scalar) -> Self {
        let public_spend = scalar_mult_base(&private_key);

        let private_view = hash_to_scalar(private_key.as_bytes());
        let public_view = scalar_mult_base(&private_view);

        let mut ota_seed = private_key.to_bytes().to_vec();
        ota_seed.extend_from_slice(OTA_KEY_DOMAIN);
        let ota_secret = hash_to_scalar(&ota_seed);
        let public_ota = scalar_mult_base(&ota_secret);

        Self {
            private_key: Some(private_key),
            payment_address: PaymentAddress {
                public_spend,
                public_view,
                public_ota,
            },
            view_key: ViewingKey {
                private_view,
                public_spend,
            },
            ota_key: OtaKey {
                secret: ota_secret,
                public_spend,
            },
        }
    }

    /// Same key set with the spend key removed.
    pub fn scanning(&self) -> Self {
        Self {
            private_key: None,
            ..self.clone()
        }
    }

    pub fn private_key(&self) -> Option<&Scalar> {
        self.private_key.as_ref()
    }

    pub fn payment_address(&self) -> &PaymentAddress {
        &self.payment_address
    }

    pub fn view_key(&self) -> &ViewingKey {
        &self.view_key
    }

    pub fn ota_key(&self) -> &OtaKey {
        &self.ota_key
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInfo {
    pub payment_address: PaymentAddress,
    pub amount: u64,
    pub message: Vec<u8>,
}

impl PaymentInfo {
    pub fn new(payment_address: PaymentAddress, amount: u64, message: Vec<u8>) -> Self {
        Self {
            payment_address,
            amount,
            message,
        }
    }
}
