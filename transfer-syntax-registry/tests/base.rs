//! Registry tests, to ensure that transfer syntaxes are properly
//! registered when linked together in a separate program.

use dicomkit_encoding::transfer_syntax::TransferSyntaxIndex;
use dicomkit_encoding::Endianness;
use dicomkit_transfer_syntax_registry::TransferSyntaxRegistry;
use rstest::rstest;

#[rstest]
#[case("1.2.840.10008.1.2", Endianness::Little, false)]
#[case("1.2.840.10008.1.2\0", Endianness::Little, false)]
#[case("1.2.840.10008.1.2.1", Endianness::Little, true)]
#[case("1.2.840.10008.1.2.2", Endianness::Big, true)]
#[case("1.2.840.10008.1.2.1.99", Endianness::Little, true)]
fn contains_base_ts(#[case] uid: &str, #[case] endianness: Endianness, #[case] explicit: bool) {
    let ts = TransferSyntaxRegistry
        .get(uid)
        .expect("transfer syntax should be registered");
    assert_eq!(ts.uid(), uid.trim_end_matches('\0'));
    assert_eq!(ts.endianness(), endianness);
    assert_eq!(ts.is_explicit_vr(), explicit);
    assert!(ts.is_native());
    assert!(ts.decoder().is_some());
    assert!(ts.encoder().is_some());
}

#[rstest]
#[case("1.2.840.10008.1.2.1.98")]
#[case("1.2.840.10008.1.2.5")]
#[case("1.2.840.10008.1.2.4.50")]
#[case("1.2.840.10008.1.2.4.51")]
#[case("1.2.840.10008.1.2.4.57")]
#[case("1.2.840.10008.1.2.4.70")]
#[case("1.2.840.10008.1.2.4.80")]
#[case("1.2.840.10008.1.2.4.81")]
#[case("1.2.840.10008.1.2.4.90")]
#[case("1.2.840.10008.1.2.4.91")]
#[case("1.2.840.10008.1.2.4.201")]
#[case("1.2.840.10008.1.2.4.202")]
#[case("1.2.840.10008.1.2.4.203")]
fn encapsulated_ts_are_explicit_le(#[case] uid: &str) {
    let ts = TransferSyntaxRegistry
        .get(uid)
        .expect("transfer syntax should be registered");
    assert!(ts.is_encapsulated());
    assert!(ts.is_explicit_vr());
    assert_eq!(ts.endianness(), Endianness::Little);
}

#[cfg(feature = "native")]
#[test]
fn native_codecs_are_available() {
    for uid in ["1.2.840.10008.1.2.5", "1.2.840.10008.1.2.4.50", "1.2.840.10008.1.2.4.70"] {
        let ts = TransferSyntaxRegistry.get(uid).unwrap();
        assert!(ts.pixel_backend().is_some(), "missing backend for {}", uid);
    }
}
