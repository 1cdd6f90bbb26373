//! Fuzz target for the on-chain account and instruction codec
//!
//! Arbitrary bytes must never panic the decoders. Anything that decodes must
//! re-encode to the same prefix (trailing allocation padding aside).

#![no_main]

use libfuzzer_sys::fuzz_target;
use joyvault_core::protocol::accounts::{
    decode_account, encode_account, AccountLayout,
};
use joyvault_core::protocol::token::TokenAccount;
use joyvault_core::protocol::{EncryptedSecret, GlobalConfig, VaultAccount, VaultInstruction};

fn check_roundtrip<T: AccountLayout + PartialEq + std::fmt::Debug>(data: &[u8]) {
    if let Ok(account) = decode_account::<T>(data) {
        let encoded = encode_account(&account).expect("decoded account must re-encode");
        assert_eq!(&data[..encoded.len()], encoded.as_slice());
        let again = decode_account::<T>(&encoded).expect("re-encoded account must decode");
        assert_eq!(account, again);
    }
}

fuzz_target!(|data: &[u8]| {
    check_roundtrip::<VaultAccount>(data);
    check_roundtrip::<EncryptedSecret>(data);
    check_roundtrip::<GlobalConfig>(data);

    let _ = TokenAccount::unpack(data);

    if let Ok(ix) = VaultInstruction::unpack(data) {
        let packed = ix.pack().expect("decoded instruction must re-encode");
        assert_eq!(VaultInstruction::unpack(&packed).ok(), Some(ix));
    }
});
