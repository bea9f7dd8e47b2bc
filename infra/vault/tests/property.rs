use flash_vault::prelude::*;
use flash_vault::{deserialize_header, serialize_header};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn seal_open_round_trips_arbitrary_buffers(
        cert in proptest::collection::vec(any::<u8>(), 0..4096),
        mac in proptest::collection::vec(any::<u8>(), 0..1024),
    ) {
        let sealed = seal(&cert, &mac).unwrap();
        let creds = open(sealed.key.expose(), &sealed.container).unwrap();

        prop_assert_eq!(creds.certificate(), cert.as_slice());
        prop_assert_eq!(creds.macaroon(), mac.as_slice());
        prop_assert_eq!(inspect(&sealed.container).unwrap(), Header::new(cert.len(), mac.len()).unwrap());
    }

    #[test]
    fn header_fidelity(cert_len in any::<u32>(), mac_len in any::<u32>()) {
        let bytes = serialize_header(cert_len as usize, mac_len as usize).unwrap();
        let header = deserialize_header(&bytes).unwrap();

        prop_assert_eq!(header.certificate_len, cert_len);
        prop_assert_eq!(header.macaroon_len, mac_len);
    }

    #[test]
    fn any_bit_flip_in_ciphertext_fails_authentication(
        payload in proptest::collection::vec(any::<u8>(), 1..256),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let sealed = seal(&payload, b"mac").unwrap();
        let mut container = sealed.container.clone();
        let index = Header::SIZE + position.index(container.len() - Header::SIZE);
        container[index] ^= 1 << bit;

        let err = open(sealed.key.expose(), &container).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Authentication);
    }
}
