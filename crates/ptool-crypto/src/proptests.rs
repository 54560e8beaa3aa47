#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand_core::{CryptoRng, OsRng, RngCore};
    use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

    use crate::codec;
    use crate::envelope::{open, seal, seal_with_rng, EPHEMERAL_PUBLIC_LEN};
    use crate::error::CryptoError;
    use crate::signature::{sign, verify};

    /// Replays bytes from a seed so sealing can be made reproducible.
    struct SeededRng {
        seed: [u8; 32],
        counter: u64,
    }

    impl RngCore for SeededRng {
        fn next_u32(&mut self) -> u32 {
            self.next_u64() as u32
        }

        fn next_u64(&mut self) -> u64 {
            let mut buf = [0u8; 8];
            self.fill_bytes(&mut buf);
            u64::from_le_bytes(buf)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(32) {
                let mut input = self.seed.to_vec();
                input.extend_from_slice(&self.counter.to_le_bytes());
                let block = crate::hash::sha256(&input);
                chunk.copy_from_slice(&block[..chunk.len()]);
                self.counter += 1;
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for SeededRng {}

    fn recipient(seed: [u8; 32]) -> (StaticSecret, [u8; 32]) {
        let secret = StaticSecret::from(seed);
        let public = *X25519PublicKey::from(&secret).as_bytes();
        (secret, public)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_codec_round_trip(bytes in any::<Vec<u8>>()) {
            let text = codec::encode(&bytes);
            prop_assert!(!text.ends_with('='));
            prop_assert_eq!(codec::decode(&text).unwrap(), bytes);
        }

        #[test]
        fn test_envelope_round_trip(
            recipient_seed in any::<[u8; 32]>(),
            payload in any::<Vec<u8>>()
        ) {
            let (secret, public) = recipient(recipient_seed);
            let env = seal(&public, &payload).unwrap();
            prop_assert_eq!(open(secret.as_bytes(), &env).unwrap(), payload);
        }

        #[test]
        fn test_envelope_single_bit_tamper(
            recipient_seed in any::<[u8; 32]>(),
            payload in prop::collection::vec(any::<u8>(), 0..256),
            position in any::<prop::sample::Index>(),
            bit in 0u8..8
        ) {
            let (secret, public) = recipient(recipient_seed);
            let mut env = seal(&public, &payload).unwrap();

            // nonce and ciphertext region
            let region = env.len() - EPHEMERAL_PUBLIC_LEN;
            let idx = EPHEMERAL_PUBLIC_LEN + position.index(region);
            env[idx] ^= 1 << bit;

            prop_assert!(matches!(
                open(secret.as_bytes(), &env),
                Err(CryptoError::AuthenticationFailed)
            ));
        }

        #[test]
        fn test_seal_is_randomized(
            recipient_seed in any::<[u8; 32]>(),
            payload in any::<Vec<u8>>()
        ) {
            let (secret, public) = recipient(recipient_seed);
            let a = seal(&public, &payload).unwrap();
            let b = seal(&public, &payload).unwrap();
            prop_assert_ne!(&a, &b);
            prop_assert_eq!(open(secret.as_bytes(), &a).unwrap(), payload.clone());
            prop_assert_eq!(open(secret.as_bytes(), &b).unwrap(), payload);
        }

        #[test]
        fn test_seal_reproducible_from_rng(
            rng_seed in any::<[u8; 32]>(),
            payload in any::<Vec<u8>>()
        ) {
            let (secret, public) = recipient(StaticSecret::random_from_rng(OsRng).to_bytes());
            let a = seal_with_rng(&public, &payload, &mut SeededRng { seed: rng_seed, counter: 0 }).unwrap();
            let b = seal_with_rng(&public, &payload, &mut SeededRng { seed: rng_seed, counter: 0 }).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(open(secret.as_bytes(), &a).unwrap(), payload);
        }

        #[test]
        fn test_signature_round_trip_and_determinism(
            seed in any::<[u8; 32]>(),
            message in any::<Vec<u8>>()
        ) {
            let public = crate::signature::public_key(&seed).unwrap();
            let sig = sign(&seed, &message).unwrap();
            prop_assert_eq!(sig, sign(&seed, &message).unwrap());
            prop_assert!(verify(&public, &message, &sig).unwrap());
        }

        #[test]
        fn test_signature_single_bit_flip(
            seed in any::<[u8; 32]>(),
            message in prop::collection::vec(any::<u8>(), 1..128),
            position in any::<prop::sample::Index>(),
            bit in 0u8..8
        ) {
            let public = crate::signature::public_key(&seed).unwrap();
            let sig = sign(&seed, &message).unwrap();

            let mut bad_message = message.clone();
            let i = position.index(bad_message.len());
            bad_message[i] ^= 1 << bit;
            prop_assert!(!verify(&public, &bad_message, &sig).unwrap());

            let mut bad_sig = sig;
            bad_sig[position.index(bad_sig.len())] ^= 1 << bit;
            prop_assert!(!verify(&public, &message, &bad_sig).unwrap());
        }
    }
}
