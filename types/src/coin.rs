use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use privacy_crypto::operation::{
    hash_to_point, hash_to_scalar, identity, point_to_bytes, random_scalar, scalar_from_u64,
    scalar_mult_base, scalar_to_u64, POINT_SIZE, SCALAR_SIZE,
};
use privacy_crypto::pedersen::commit_scalar;
use privacy_crypto::reader::ByteReader;
use privacy_crypto::utils::{hash_h, HASH_SIZE};
use privacy_crypto::{CryptoError, Result};

use crate::impl_hex_serde;
use crate::key::{KeySet, PaymentAddress, PaymentInfo};
use crate::tx_random::{TxRandom, TX_RANDOM_SIZE};

pub const MAX_SIZE_INFO_COIN: usize = 255;

/// `HashToScalar(shared || u32_be(index))`
pub(crate) fn ota_hash(shared: &RistrettoPoint, index: u32) -> Scalar {
    let mut b = Vec::with_capacity(POINT_SIZE + 4);
    b.extend_from_slice(&point_to_bytes(shared));
    b.extend_from_slice(&index.to_be_bytes());
    hash_to_scalar(&b)
}

/// `H(r·PublicOTA || index)·G + PublicSpend`
pub(crate) fn one_time_public_key(
    shared_random: &Scalar,
    address: &PaymentAddress,
    index: u32,
) -> RistrettoPoint {
    let rk = address.public_ota() * shared_random;
    scalar_mult_base(&ota_hash(&rk, index)) + address.public_spend()
}

/// Blinding offsets `(mask, amount)` derived from the conceal shared point.
fn conceal_offsets(shared: &RistrettoPoint) -> (Scalar, Scalar) {
    let h1 = hash_to_scalar(&point_to_bytes(shared));
    let h2 = hash_to_scalar(h1.as_bytes());
    let h3 = hash_to_scalar(h2.as_bytes());
    (h2, h3)
}

/// A ledger coin. Fields that are absent encode with a zero length byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coin {
    info: Vec<u8>,
    public_key: Option<RistrettoPoint>,
    commitment: Option<RistrettoPoint>,
    key_image: Option<RistrettoPoint>,
    shared_random: Option<Scalar>,
    shared_conceal_random: Option<Scalar>,
    tx_random: Option<TxRandom>,
    mask: Option<Scalar>,
    amount: Option<Scalar>,
    asset_tag: Option<RistrettoPoint>,
}

impl Coin {
    /// Output coin for a payment. Amount and mask stay in the clear until
    /// `conceal_output_coin`.
    pub fn new_from_payment_info(info: &PaymentInfo) -> Self {
        let amount = scalar_from_u64(info.amount);
        let mask = random_scalar();
        let shared_random = random_scalar();
        let shared_conceal_random = random_scalar();
        let index = 0;

        let public_key = one_time_public_key(&shared_random, &info.payment_address, index);
        let tx_random = TxRandom::new(
            &scalar_mult_base(&shared_random),
            index,
            &scalar_mult_base(&shared_conceal_random),
        );

        Self {
            info: info.message.clone(),
            public_key: Some(public_key),
            commitment: Some(commit_scalar(&amount, &mask)),
            key_image: None,
            shared_random: Some(shared_random),
            shared_conceal_random: Some(shared_conceal_random),
            tx_random: Some(tx_random),
            mask: Some(mask),
            amount: Some(amount),
            asset_tag: None,
        }
    }

    /// Plaintext coin addressed by an already derived one-time key, as used
    /// for mint and shield outputs.
    pub fn new_from_amount_and_tx_random(
        amount: u64,
        public_key: RistrettoPoint,
        tx_random: TxRandom,
        info: Vec<u8>,
    ) -> Self {
        let amount = scalar_from_u64(amount);
        let mask = random_scalar();
        Self {
            info,
            public_key: Some(public_key),
            commitment: Some(commit_scalar(&amount, &mask)),
            tx_random: Some(tx_random),
            mask: Some(mask),
            amount: Some(amount),
            ..Self::default()
        }
    }

    pub fn info(&self) -> &[u8] {
        &self.info
    }

    pub fn public_key(&self) -> Option<&RistrettoPoint> {
        self.public_key.as_ref()
    }

    pub fn commitment(&self) -> Option<&RistrettoPoint> {
        self.commitment.as_ref()
    }

    pub fn key_image(&self) -> Option<&RistrettoPoint> {
        self.key_image.as_ref()
    }

    pub fn shared_random(&self) -> Option<&Scalar> {
        self.shared_random.as_ref()
    }

    pub fn shared_conceal_random(&self) -> Option<&Scalar> {
        self.shared_conceal_random.as_ref()
    }

    pub fn tx_random(&self) -> Option<&TxRandom> {
        self.tx_random.as_ref()
    }

    pub fn mask(&self) -> Option<&Scalar> {
        self.mask.as_ref()
    }

    pub fn amount(&self) -> Option<&Scalar> {
        self.amount.as_ref()
    }

    pub fn asset_tag(&self) -> Option<&RistrettoPoint> {
        self.asset_tag.as_ref()
    }

    pub fn is_confidential_asset(&self) -> bool {
        self.asset_tag.is_some()
    }

    /// Plaintext value, or 0 while the coin is concealed.
    pub fn value(&self) -> u64 {
        match (&self.amount, self.is_encrypted()) {
            (Some(amount), false) => scalar_to_u64(amount),
            _ => 0,
        }
    }

    pub fn set_info(&mut self, info: Vec<u8>) {
        self.info = info;
    }

    pub fn set_key_image(&mut self, key_image: Option<RistrettoPoint>) {
        self.key_image = key_image;
    }

    pub fn set_asset_tag(&mut self, asset_tag: Option<RistrettoPoint>) {
        self.asset_tag = asset_tag;
    }

    pub fn is_encrypted(&self) -> bool {
        match (&self.mask, &self.amount, &self.commitment) {
            (Some(mask), Some(amount), Some(commitment)) => {
                commit_scalar(amount, mask) != *commitment
            }
            _ => true,
        }
    }

    /// Blinds mask and amount for the receiver's view key. No-op for a coin
    /// that is already concealed or was not created locally.
    pub fn conceal_output_coin(&mut self, public_view: &RistrettoPoint) {
        let Some(conceal_random) = self.shared_conceal_random else {
            return;
        };
        if self.is_encrypted() {
            return;
        }
        let (mask_offset, amount_offset) = conceal_offsets(&(public_view * conceal_random));
        self.mask = self.mask.map(|m| m + mask_offset);
        self.amount = self.amount.map(|a| a + amount_offset);
        self.shared_conceal_random = None;
        self.shared_random = None;
    }

    /// Keeps only the key image.
    pub fn conceal_input_coin(&mut self) {
        self.amount = Some(Scalar::ZERO);
        self.mask = None;
        self.public_key = None;
        self.commitment = None;
        self.tx_random = Some(TxRandom::new(&identity(), 0, &identity()));
    }

    /// One-time private key: `H(OTARandomPoint·otaSecret || index) + sk`.
    pub fn private_key_of_coin(&self, key_set: &KeySet) -> Result<Scalar> {
        let sk = key_set
            .private_key()
            .ok_or_else(|| CryptoError::invalid_input("key set has no private key"))?;
        let tx_random = self.require_tx_random()?;
        let rk = tx_random.ota_random_point()? * key_set.ota_key().secret();
        Ok(ota_hash(&rk, tx_random.index()) + sk)
    }

    /// `HashToPoint(PublicKey)·privateKeyOfCoin`
    pub fn key_image_with_private_key(&self, key_set: &KeySet) -> Result<RistrettoPoint> {
        let public_key = self
            .public_key
            .ok_or_else(|| CryptoError::invalid_input("coin has no public key"))?;
        let k = self.private_key_of_coin(key_set)?;
        Ok(hash_to_point(&point_to_bytes(&public_key)) * k)
    }

    pub fn belongs_to(&self, key_set: &KeySet) -> bool {
        let (Some(public_key), Some(tx_random)) = (&self.public_key, &self.tx_random) else {
            return false;
        };
        let Ok(ota_point) = tx_random.ota_random_point() else {
            return false;
        };
        let rk = ota_point * key_set.ota_key().secret();
        let expected_spend = public_key - scalar_mult_base(&ota_hash(&rk, tx_random.index()));
        expected_spend == *key_set.ota_key().public_spend()
    }

    /// Recovers key image, mask and amount. A concealed coin whose recovered
    /// opening does not match its commitment is rejected.
    pub fn decrypt(&self, key_set: &KeySet) -> Result<Coin> {
        let mut coin = self.clone();
        if key_set.private_key().is_some() {
            coin.key_image = Some(coin.key_image_with_private_key(key_set)?);
        }
        if !coin.is_encrypted() {
            return Ok(coin);
        }

        let (Some(mask), Some(amount), Some(commitment)) =
            (coin.mask, coin.amount, coin.commitment)
        else {
            return Err(CryptoError::Decryption(
                "coin is missing mask, amount or commitment".into(),
            ));
        };
        let conceal_point = coin.require_tx_random()?.conceal_random_point()?;
        let shared = conceal_point * key_set.view_key().private_view();
        let (mask_offset, amount_offset) = conceal_offsets(&shared);

        let mask = mask - mask_offset;
        let amount = amount - amount_offset;
        if commit_scalar(&amount, &mask) != commitment {
            return Err(CryptoError::Decryption(
                "commitment does not open to the recovered amount".into(),
            ));
        }
        coin.mask = Some(mask);
        coin.amount = Some(amount);
        Ok(coin)
    }

    /// Checks a plaintext coin against the payment address and shared random
    /// it was created with.
    pub fn check_coin_valid(
        &self,
        address: &PaymentAddress,
        shared_random: &Scalar,
        amount: u64,
    ) -> bool {
        if self.value() != amount {
            return false;
        }
        let (Some(public_key), Some(tx_random)) = (&self.public_key, &self.tx_random) else {
            return false;
        };
        match tx_random.ota_random_point() {
            Ok(p) if p == scalar_mult_base(shared_random) => {}
            _ => return false,
        }
        one_time_public_key(shared_random, address, tx_random.index()) == *public_key
    }

    fn require_tx_random(&self) -> Result<&TxRandom> {
        self.tx_random
            .as_ref()
            .ok_or_else(|| CryptoError::invalid_input("coin has no tx random"))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let info_len = self.info.len().min(MAX_SIZE_INFO_COIN);
        let mut b = Vec::with_capacity(1 + info_len + 8 * 33 + 1 + TX_RANDOM_SIZE);
        b.push(info_len as u8);
        b.extend_from_slice(&self.info[..info_len]);

        push_point(&mut b, self.public_key.as_ref());
        push_point(&mut b, self.commitment.as_ref());
        push_point(&mut b, self.key_image.as_ref());
        push_scalar(&mut b, self.shared_random.as_ref());
        push_scalar(&mut b, self.shared_conceal_random.as_ref());
        match &self.tx_random {
            Some(t) => {
                b.push(TX_RANDOM_SIZE as u8);
                b.extend_from_slice(&t.to_bytes());
            }
            None => b.push(0),
        }
        push_scalar(&mut b, self.mask.as_ref());
        push_scalar(&mut b, self.amount.as_ref());
        push_point(&mut b, self.asset_tag.as_ref());
        b
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CryptoError::parse("coin bytes are empty"));
        }
        let mut reader = ByteReader::new(bytes);

        let info_len = reader.read_u8("coin info length")? as usize;
        let info = reader.read_bytes(info_len, "coin info")?.to_vec();
        let public_key = reader.read_optional_point("coin public key")?;
        let commitment = reader.read_optional_point("coin commitment")?;
        let key_image = reader.read_optional_point("coin key image")?;
        let shared_random = reader.read_optional_scalar("coin shared random")?;
        let shared_conceal_random = reader.read_optional_scalar("coin shared conceal random")?;

        let tx_random_len = reader.read_u8("coin tx random length")? as usize;
        if tx_random_len != TX_RANDOM_SIZE {
            return Err(CryptoError::parse(format!(
                "coin tx random length {} is not {}",
                tx_random_len, TX_RANDOM_SIZE
            )));
        }
        let tx_random = Some(TxRandom::from_bytes(
            reader.read_bytes(TX_RANDOM_SIZE, "coin tx random")?,
        )?);

        let mask = reader.read_optional_scalar("coin mask")?;
        let amount = reader.read_optional_scalar("coin amount")?;
        // Older encodings end before the asset tag.
        let asset_tag = if reader.is_empty() {
            None
        } else {
            reader.read_optional_point("coin asset tag")?
        };
        reader.finish("coin")?;

        Ok(Self {
            info,
            public_key,
            commitment,
            key_image,
            shared_random,
            shared_conceal_random,
            tx_random,
            mask,
            amount,
            asset_tag,
        })
    }

    pub fn hash_h(&self) -> [u8; HASH_SIZE] {
        hash_h(&self.to_bytes())
    }
}

fn push_point(b: &mut Vec<u8>, point: Option<&RistrettoPoint>) {
    match point {
        Some(p) => {
            b.push(POINT_SIZE as u8);
            b.extend_from_slice(&point_to_bytes(p));
        }
        None => b.push(0),
    }
}

fn push_scalar(b: &mut Vec<u8>, scalar: Option<&Scalar>) {
    match scalar {
        Some(s) => {
            b.push(SCALAR_SIZE as u8);
            b.extend_from_slice(s.as_bytes());
        }
        None => b.push(0),
    }
}

impl_hex_serde!(Coin);

#[cfg(test)]
mod tests {
    use super::*;
    use privacy_crypto::operation::random_point;

    fn payment_to(seed: &[u8], amount: u64) -> (KeySet, Coin) {
        let ks = KeySet::from_seed(seed);
        let info = PaymentInfo::new(*ks.payment_address(), amount, b"memo".to_vec());
        let coin = Coin::new_from_payment_info(&info);
        (ks, coin)
    }

    #[test]
    fn test_new_coin_is_plaintext() {
        let (ks, coin) = payment_to(b"r1", 500);
        assert!(!coin.is_encrypted());
        assert_eq!(coin.value(), 500);
        assert_eq!(coin.info(), b"memo");
        assert!(coin.belongs_to(&ks));
        assert!(!coin.belongs_to(&KeySet::from_seed(b"other")));
        assert!(coin.check_coin_valid(
            ks.payment_address(),
            coin.shared_random().unwrap(),
            500
        ));
        assert!(!coin.check_coin_valid(ks.payment_address(), &random_scalar(), 500));
    }

    #[test]
    fn test_conceal_decrypt_round_trip() {
        let (ks, coin) = payment_to(b"r2", 100);
        let mut concealed = coin.clone();
        concealed.conceal_output_coin(ks.payment_address().public_view());

        assert!(concealed.is_encrypted());
        assert_eq!(concealed.value(), 0);
        assert!(concealed.shared_random().is_none());
        assert!(concealed.shared_conceal_random().is_none());
        assert_eq!(concealed.commitment(), coin.commitment());

        let decrypted = concealed.decrypt(&ks).unwrap();
        assert_eq!(decrypted.value(), 100);
        assert_eq!(decrypted.mask(), coin.mask());
        assert_eq!(decrypted.amount(), coin.amount());
        assert!(decrypted.key_image().is_some());

        let stranger = KeySet::from_seed(b"stranger");
        assert!(matches!(
            concealed.decrypt(&stranger),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn test_conceal_is_idempotent() {
        let (ks, mut coin) = payment_to(b"r3", 9);
        let view = *ks.payment_address().public_view();
        coin.conceal_output_coin(&view);
        let once = coin.clone();
        coin.conceal_output_coin(&view);
        assert_eq!(coin, once);
    }

    #[test]
    fn test_scanning_key_set_decrypts_without_key_image() {
        let (ks, mut coin) = payment_to(b"r4", 42);
        coin.conceal_output_coin(ks.payment_address().public_view());

        let decrypted = coin.decrypt(&ks.scanning()).unwrap();
        assert_eq!(decrypted.value(), 42);
        assert!(decrypted.key_image().is_none());
        assert!(coin.private_key_of_coin(&ks.scanning()).is_err());
    }

    #[test]
    fn test_key_image_matches_coin_private_key() {
        let (ks, coin) = payment_to(b"r5", 1);
        let k = coin.private_key_of_coin(&ks).unwrap();
        assert_eq!(scalar_mult_base(&k), *coin.public_key().unwrap());

        let ki = coin.key_image_with_private_key(&ks).unwrap();
        assert_eq!(ki, coin.key_image_with_private_key(&ks).unwrap());
        assert_eq!(ki, hash_to_point(&point_to_bytes(coin.public_key().unwrap())) * k);
    }

    #[test]
    fn test_conceal_input_coin_keeps_key_image_only() {
        let (ks, coin) = payment_to(b"r6", 77);
        let mut input = coin.decrypt(&ks).unwrap();
        let ki = *input.key_image().unwrap();
        input.conceal_input_coin();

        assert_eq!(input.key_image(), Some(&ki));
        assert!(input.public_key().is_none());
        assert!(input.commitment().is_none());
        assert!(input.mask().is_none());
        assert_eq!(input.amount(), Some(&Scalar::ZERO));
        assert_eq!(input.tx_random().unwrap().to_bytes(), [0u8; TX_RANDOM_SIZE]);

        let recovered = Coin::from_bytes(&input.to_bytes()).unwrap();
        assert_eq!(recovered, input);
    }

    #[test]
    fn test_coin_bytes() {
        let (ks, coin) = payment_to(b"r7", 1234);
        assert_eq!(Coin::from_bytes(&coin.to_bytes()).unwrap(), coin);

        let mut concealed = coin.clone();
        concealed.conceal_output_coin(ks.payment_address().public_view());
        assert_eq!(Coin::from_bytes(&concealed.to_bytes()).unwrap(), concealed);

        let mut tagged = coin.clone();
        tagged.set_asset_tag(Some(random_point()));
        let recovered = Coin::from_bytes(&tagged.to_bytes()).unwrap();
        assert_eq!(recovered.asset_tag(), tagged.asset_tag());
    }

    #[test]
    fn test_coin_without_trailing_asset_tag() {
        let (_, coin) = payment_to(b"r8", 5);
        let mut bytes = coin.to_bytes();
        assert_eq!(bytes.pop(), Some(0));

        let recovered = Coin::from_bytes(&bytes).unwrap();
        assert!(recovered.asset_tag().is_none());
        assert_eq!(recovered, coin);
    }

    #[test]
    fn test_coin_bytes_rejects_malformed() {
        let (_, coin) = payment_to(b"r9", 5);
        let bytes = coin.to_bytes();

        assert!(Coin::from_bytes(&[]).is_err());
        assert!(Coin::from_bytes(&bytes[..bytes.len() - 40]).is_err());

        let mut long_info = bytes.clone();
        long_info[0] = 250;
        assert!(Coin::from_bytes(&long_info).is_err());

        let mut trailing = bytes;
        trailing.push(1);
        assert!(Coin::from_bytes(&trailing).is_err());
    }

    #[test]
    fn test_coin_bytes_require_full_tx_random() {
        assert!(Coin::from_bytes(&Coin::default().to_bytes()).is_err());

        let (_, coin) = payment_to(b"r10", 5);
        let bytes = coin.to_bytes();
        // tx random, then mask and amount of 33 bytes each and an empty asset tag
        let at = bytes.len() - (1 + TX_RANDOM_SIZE) - 2 * 33 - 1;
        assert_eq!(bytes[at], TX_RANDOM_SIZE as u8);

        let mut empty = bytes[..at].to_vec();
        empty.push(0);
        empty.extend_from_slice(&bytes[at + 1 + TX_RANDOM_SIZE..]);
        assert!(Coin::from_bytes(&empty).is_err());

        let mut short = bytes.clone();
        short[at] = 32;
        assert!(Coin::from_bytes(&short).is_err());
    }

    #[test]
    fn test_info_is_capped() {
        let ks = KeySet::from_seed(b"info");
        let info = PaymentInfo::new(*ks.payment_address(), 1, vec![7u8; 300]);
        let coin = Coin::new_from_payment_info(&info);
        let recovered = Coin::from_bytes(&coin.to_bytes()).unwrap();
        assert_eq!(recovered.info().len(), MAX_SIZE_INFO_COIN);
    }

    #[test]
    fn test_mint_coin_plaintext() {
        let ks = KeySet::from_seed(b"mint");
        let tx_random = TxRandom::new(&random_point(), 1, &random_point());
        let coin = Coin::new_from_amount_and_tx_random(100_000, random_point(), tx_random, Vec::new());
        assert!(!coin.is_encrypted());
        assert_eq!(coin.value(), 100_000);
        assert!(coin.shared_conceal_random().is_none());
        assert!(!coin.belongs_to(&ks));
    }

    #[test]
    fn test_coin_json() {
        let (_, coin) = payment_to(b"json", 3);
        let json = serde_json::to_string(&coin).unwrap();
        let back: Coin = serde_json::from_str(&json).unwrap();
        assert_eq!(back, coin);
    }
}
