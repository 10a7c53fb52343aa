//! Signing Integration Tests
//!
//! End-to-end sessions through the orchestrator with scripted Ledger and
//! Trezor transports. The Ledger scripts replay signatures captured from a
//! real device, so the signed output must match byte for byte.

use cardano_hw_signer::error::{ErrorCode, SignerError, SignerResult};
use cardano_hw_signer::signing::ledger::{
    LedgerAddressRequest, LedgerSignRequest, LedgerSignResponse, LedgerTransport, LedgerVersion,
    LedgerWitness, LedgerXpub,
};
use cardano_hw_signer::signing::trezor::{
    TrezorAddressRequest, TrezorFeatures, TrezorPublicKey, TrezorSignRequest, TrezorSignResponse,
    TrezorTransport,
};
use cardano_hw_signer::signing::{LedgerWallet, SigningOrchestrator, TrezorWallet};
use cardano_hw_signer::tx::WitnessOutput;
use cardano_hw_signer::wallet::roles;
use cardano_hw_signer::{
    DerivationPath, DerivationScheme, ExtendedPublicKey, HwSigningData, SignerSettings,
    WitnessRecord,
};

// MARK: - Vectors

const PAYMENT_XPUB: &str = "5840cd2b047d1a803eee059769cffb3dfd0a4b9327e55bc78aa962d9bd4f720db0b2914ba07fb381f23c5c09bce26587bdf359aab7ea8f4192adbf93a38fd893ccea";
const STAKE_XPUB: &str = "584066610efd336e1137c525937b76511fbcf2a0e6bcf0d340a67bcb39bc870d85e8e977e956d29810dbfbda9c8ea667585982454e401c68578623d4b86bc7eb7b58";

const SIMPLE_UNSIGNED: &str = "82a40081825820941a33cf9d39bba4102c4eff8bd54efd72cf93e65a023a4475ba48a58fc0de000001818258390114c16d7f43243bd81478e68b9db53a8528fd4fb1078d58d54a7f11241d227aefa4b773149170885aadba30aab3127cc611ddbc4999def61c1a002b2b4b021a00029b75031a00a8474cf6";
const SIMPLE_ID: &str = "ca7b59e959a6a7cf570468438c728c7693bc1582450b89ea095f3d04ae312e6a";
const SIMPLE_PAYMENT_SIG: &str = "93cbb49246dffb2cb2ca2c18e75039bdb4f80730bb9478045c4b8ef5494145a71bd59a478df4ec0dd22e78c9fc919918f4404115fafb10fa4f218b269d3e220a";
const SIMPLE_SIGNED: &str = "83a40081825820941a33cf9d39bba4102c4eff8bd54efd72cf93e65a023a4475ba48a58fc0de000001818258390114c16d7f43243bd81478e68b9db53a8528fd4fb1078d58d54a7f11241d227aefa4b773149170885aadba30aab3127cc611ddbc4999def61c1a002b2b4b021a00029b75031a00a8474ca10081825820cd2b047d1a803eee059769cffb3dfd0a4b9327e55bc78aa962d9bd4f720db0b2584093cbb49246dffb2cb2ca2c18e75039bdb4f80730bb9478045c4b8ef5494145a71bd59a478df4ec0dd22e78c9fc919918f4404115fafb10fa4f218b269d3e220af6";

const WITHDRAWAL_UNSIGNED: &str = "82a50081825820bc8bf52ea894fb8e442fe3eea628be87d0c9a37baef185b70eb00a5c8a849d3b0001818258390114c16d7f43243bd81478e68b9db53a8528fd4fb1078d58d54a7f11241d227aefa4b773149170885aadba30aab3127cc611ddbc4999def61c1a00311cba021a0002c431031a00ac30b105a1581de11d227aefa4b773149170885aadba30aab3127cc611ddbc4999def61c1a000ded3af6";
const WITHDRAWAL_ID: &str = "de59b913705be59f6aff90df6eccfe4f0f115bc8de8306a77b188642b763ad61";
const WITHDRAWAL_PAYMENT_SIG: &str = "501a09efd212efd741574e63e9ff6c701746cac68ddcba3af5ef655ff1e724399adef1eb258ffdb34fd09d7b91c4b2f612bfba083b2debaa87ed93fcf4bc1f08";
const WITHDRAWAL_STAKE_SIG: &str = "eeb76938fd9676a34ba0710dc27810d087507b3a75ac6f67543b0b22405c927ad9f575a258aa7ed1dd1bbf3d24596315ffba8d630e0a1ea8d105826b865b3808";
const WITHDRAWAL_SIGNED: &str = "83a50081825820bc8bf52ea894fb8e442fe3eea628be87d0c9a37baef185b70eb00a5c8a849d3b0001818258390114c16d7f43243bd81478e68b9db53a8528fd4fb1078d58d54a7f11241d227aefa4b773149170885aadba30aab3127cc611ddbc4999def61c1a00311cba021a0002c431031a00ac30b105a1581de11d227aefa4b773149170885aadba30aab3127cc611ddbc4999def61c1a000ded3aa10082825820cd2b047d1a803eee059769cffb3dfd0a4b9327e55bc78aa962d9bd4f720db0b25840501a09efd212efd741574e63e9ff6c701746cac68ddcba3af5ef655ff1e724399adef1eb258ffdb34fd09d7b91c4b2f612bfba083b2debaa87ed93fcf4bc1f0882582066610efd336e1137c525937b76511fbcf2a0e6bcf0d340a67bcb39bc870d85e85840eeb76938fd9676a34ba0710dc27810d087507b3a75ac6f67543b0b22405c927ad9f575a258aa7ed1dd1bbf3d24596315ffba8d630e0a1ea8d105826b865b3808f6";

// MARK: - Helper Functions

fn payment0() -> HwSigningData {
    HwSigningData::payment(
        DerivationPath::shelley(0, roles::EXTERNAL, 0),
        ExtendedPublicKey::from_hex(PAYMENT_XPUB).unwrap(),
    )
}

fn stake0() -> HwSigningData {
    HwSigningData::stake(
        DerivationPath::shelley(0, roles::STAKING, 0),
        ExtendedPublicKey::from_hex(STAKE_XPUB).unwrap(),
    )
}

/// Replays a recorded device answer and keeps the request it was sent
struct ScriptedLedger {
    tx_hash_hex: String,
    witnesses: Vec<(DerivationPath, &'static str)>,
    requests: Vec<LedgerSignRequest>,
}

impl ScriptedLedger {
    fn new(tx_hash_hex: &str, witnesses: Vec<(DerivationPath, &'static str)>) -> Self {
        Self {
            tx_hash_hex: tx_hash_hex.to_string(),
            witnesses,
            requests: Vec::new(),
        }
    }
}

impl LedgerTransport for ScriptedLedger {
    fn get_version(&mut self) -> SignerResult<LedgerVersion> {
        Ok(LedgerVersion {
            major: 2,
            minor: 0,
            patch: 4,
        })
    }

    fn get_extended_public_key(&mut self, _path: &DerivationPath) -> SignerResult<LedgerXpub> {
        Ok(LedgerXpub {
            public_key_hex: PAYMENT_XPUB[4..68].to_string(),
            chain_code_hex: PAYMENT_XPUB[68..].to_string(),
        })
    }

    fn show_address(&mut self, _request: &LedgerAddressRequest) -> SignerResult<()> {
        Err(SignerError::device_operation("Action rejected by user"))
    }

    fn sign_transaction(&mut self, request: &LedgerSignRequest) -> SignerResult<LedgerSignResponse> {
        self.requests.push(request.clone());
        Ok(LedgerSignResponse {
            tx_hash_hex: self.tx_hash_hex.clone(),
            witnesses: self
                .witnesses
                .iter()
                .map(|(path, signature)| LedgerWitness {
                    path: path.clone(),
                    witness_signature_hex: signature.to_string(),
                })
                .collect(),
        })
    }
}

/// Answers every signing call with the same serialized transaction
struct ScriptedTrezor {
    hash: String,
    serialized_tx: String,
}

impl TrezorTransport for ScriptedTrezor {
    fn get_features(&mut self) -> SignerResult<TrezorFeatures> {
        Ok(TrezorFeatures {
            major_version: 2,
            minor_version: 3,
            patch_version: 6,
        })
    }

    fn get_public_key(&mut self, _path: &DerivationPath) -> SignerResult<TrezorPublicKey> {
        Ok(TrezorPublicKey {
            public_key: STAKE_XPUB[4..].to_string(),
        })
    }

    fn show_address(&mut self, request: &TrezorAddressRequest) -> SignerResult<()> {
        assert!(request.show_on_trezor);
        Ok(())
    }

    fn sign_transaction(&mut self, _request: &TrezorSignRequest) -> SignerResult<TrezorSignResponse> {
        Ok(TrezorSignResponse {
            hash: self.hash.clone(),
            serialized_tx: self.serialized_tx.clone(),
        })
    }
}

// MARK: - Ledger

#[test]
fn test_ledger_signs_simple_transaction() {
    let mut device = LedgerWallet::new(
        ScriptedLedger::new(SIMPLE_ID, vec![(payment0().derivation_path, SIMPLE_PAYMENT_SIG)]),
        DerivationScheme::V2,
    );
    let mut orchestrator = SigningOrchestrator::new(&mut device, SignerSettings::default()).unwrap();

    let signed = orchestrator
        .sign(SIMPLE_UNSIGNED, &[payment0()], &[])
        .unwrap();
    assert_eq!(signed.to_hex().unwrap(), SIMPLE_SIGNED);

    let output = signed.to_output().unwrap();
    assert_eq!(output.r#type, "TxSignedShelley");
    assert_eq!(output.cbor_hex, SIMPLE_SIGNED);

    let sent = &device.transport().requests[0];
    assert_eq!(sent.fee_str, "170869");
    assert_eq!(sent.ttl_str, "11028300");
    assert_eq!(sent.network_id, 1);
    assert_eq!(sent.protocol_magic, 764_824_073);
    assert_eq!(sent.inputs[0].path, Some(payment0().derivation_path));
}

#[test]
fn test_ledger_signs_transaction_with_withdrawal() {
    let mut device = LedgerWallet::new(
        ScriptedLedger::new(
            WITHDRAWAL_ID,
            vec![
                (payment0().derivation_path, WITHDRAWAL_PAYMENT_SIG),
                (stake0().derivation_path, WITHDRAWAL_STAKE_SIG),
            ],
        ),
        DerivationScheme::V2,
    );
    let mut orchestrator = SigningOrchestrator::new(&mut device, SignerSettings::default()).unwrap();

    let signed = orchestrator
        .sign(WITHDRAWAL_UNSIGNED, &[payment0(), stake0()], &[])
        .unwrap();
    assert_eq!(signed.to_hex().unwrap(), WITHDRAWAL_SIGNED);

    let sent = &device.transport().requests[0];
    assert_eq!(sent.withdrawals.len(), 1);
    assert_eq!(sent.withdrawals[0].path, stake0().derivation_path);
    assert_eq!(sent.withdrawals[0].amount_str, "912698");
}

#[test]
fn test_ledger_witnesses_withdrawal_with_stake_key() {
    let mut device = LedgerWallet::new(
        ScriptedLedger::new(
            WITHDRAWAL_ID,
            vec![(stake0().derivation_path, WITHDRAWAL_STAKE_SIG)],
        ),
        DerivationScheme::V2,
    );
    let mut orchestrator = SigningOrchestrator::new(&mut device, SignerSettings::default()).unwrap();

    let record = orchestrator
        .witness(WITHDRAWAL_UNSIGNED, &stake0(), &[])
        .unwrap();
    assert_eq!(record.pub_key(), &stake0().xpub.pub_key);

    let output = record.to_output().unwrap();
    assert_eq!(output.r#type, WitnessOutput::SHELLEY_TYPE);
    assert_eq!(
        output.cbor_hex,
        format!("8200825820{}5840{}", &STAKE_XPUB[4..68], WITHDRAWAL_STAKE_SIG)
    );
    assert!(matches!(output.witness().unwrap(), WitnessRecord::Shelley(_)));

    // inputs belong to another signer
    let sent = &device.transport().requests[0];
    assert_eq!(sent.inputs[0].path, None);
}

#[test]
fn test_ledger_mismatched_id_produces_nothing() {
    let mut device = LedgerWallet::new(
        ScriptedLedger::new(
            WITHDRAWAL_ID,
            vec![(payment0().derivation_path, SIMPLE_PAYMENT_SIG)],
        ),
        DerivationScheme::V2,
    );
    let mut orchestrator = SigningOrchestrator::new(&mut device, SignerSettings::default()).unwrap();

    let err = orchestrator
        .sign(SIMPLE_UNSIGNED, &[payment0()], &[])
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TxSerializationMismatch);
    assert_eq!(
        err.details,
        Some(format!("local={} device={}", SIMPLE_ID, WITHDRAWAL_ID))
    );
}

#[test]
fn test_ledger_multiple_witnesses_rejected_in_witness_mode() {
    let mut device = LedgerWallet::new(
        ScriptedLedger::new(
            WITHDRAWAL_ID,
            vec![
                (stake0().derivation_path, WITHDRAWAL_STAKE_SIG),
                (stake0().derivation_path, WITHDRAWAL_STAKE_SIG),
            ],
        ),
        DerivationScheme::V2,
    );
    let mut orchestrator = SigningOrchestrator::new(&mut device, SignerSettings::default()).unwrap();

    let err = orchestrator
        .witness(WITHDRAWAL_UNSIGNED, &stake0(), &[])
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MultipleWitnesses);
}

#[test]
fn test_ledger_signature_for_wrong_transaction_fails_verification() {
    // right id, signature taken from another transaction
    let mut device = LedgerWallet::new(
        ScriptedLedger::new(
            SIMPLE_ID,
            vec![(payment0().derivation_path, WITHDRAWAL_PAYMENT_SIG)],
        ),
        DerivationScheme::V2,
    );
    let mut orchestrator = SigningOrchestrator::new(&mut device, SignerSettings::default()).unwrap();

    let err = orchestrator
        .sign(SIMPLE_UNSIGNED, &[payment0()], &[])
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::WitnessVerification);
}

#[test]
fn test_ledger_device_calls() {
    let mut device = LedgerWallet::new(ScriptedLedger::new(SIMPLE_ID, vec![]), DerivationScheme::V2);
    let mut orchestrator = SigningOrchestrator::new(&mut device, SignerSettings::default()).unwrap();

    assert_eq!(
        orchestrator.device_version().unwrap(),
        "Ledger app version 2.0.4"
    );

    let err = orchestrator
        .show_address(&payment0().derivation_path, None, &[0x61; 29])
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DeviceOperation);
    assert!(err.is_retryable());

    // an account-level path comes straight from the device
    let account = DerivationPath::new(payment0().derivation_path.indices()[..3].to_vec());
    assert_eq!(
        orchestrator.extended_public_key(&account).unwrap(),
        payment0().xpub
    );
}

// MARK: - Trezor

#[test]
fn test_trezor_signs_transaction_with_withdrawal() {
    let mut device = TrezorWallet::new(ScriptedTrezor {
        hash: WITHDRAWAL_ID.to_string(),
        serialized_tx: WITHDRAWAL_SIGNED.to_string(),
    });
    let mut orchestrator = SigningOrchestrator::new(&mut device, SignerSettings::default()).unwrap();

    let signed = orchestrator
        .sign(WITHDRAWAL_UNSIGNED, &[payment0(), stake0()], &[])
        .unwrap();
    assert_eq!(signed.to_hex().unwrap(), WITHDRAWAL_SIGNED);
    assert_eq!(signed.witness_count(), 2);
}

#[test]
fn test_trezor_device_calls() {
    let mut device = TrezorWallet::new(ScriptedTrezor {
        hash: SIMPLE_ID.to_string(),
        serialized_tx: SIMPLE_SIGNED.to_string(),
    });
    let mut orchestrator = SigningOrchestrator::new(&mut device, SignerSettings::default()).unwrap();

    assert_eq!(
        orchestrator.device_version().unwrap(),
        "Trezor app version 2.3.6"
    );
    assert!(orchestrator
        .show_address(
            &payment0().derivation_path,
            Some(&stake0().derivation_path),
            &hex::decode(&SIMPLE_UNSIGNED[90..204]).unwrap(),
        )
        .is_ok());
    assert_eq!(
        orchestrator
            .extended_public_key(&stake0().derivation_path)
            .unwrap(),
        stake0().xpub
    );
}

#[test]
fn test_trezor_witness_for_unknown_key_is_rejected() {
    let mut device = TrezorWallet::new(ScriptedTrezor {
        hash: SIMPLE_ID.to_string(),
        serialized_tx: SIMPLE_SIGNED.to_string(),
    });
    let mut orchestrator = SigningOrchestrator::new(&mut device, SignerSettings::default()).unwrap();

    // the device signed with payment0, but only the stake key was offered
    let err = orchestrator
        .witness(SIMPLE_UNSIGNED, &stake0(), &[])
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedWitnessKey);
}

// MARK: - Stateless Operations

#[test]
fn test_transaction_ids_without_device() {
    assert_eq!(
        SigningOrchestrator::<LedgerWallet<ScriptedLedger>>::transaction_id_hex(SIMPLE_UNSIGNED)
            .unwrap(),
        SIMPLE_ID
    );
    assert_eq!(
        SigningOrchestrator::<LedgerWallet<ScriptedLedger>>::transaction_id_hex(
            WITHDRAWAL_UNSIGNED
        )
        .unwrap(),
        WITHDRAWAL_ID
    );
}
