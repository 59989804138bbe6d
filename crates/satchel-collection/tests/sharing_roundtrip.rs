//! Two-user sharing flow: invite, fingerprint comparison, accept,
//! wrong-recipient rejection.

use satchel_collection::{Collection, CollectionMeta, SignedInvitation};
use satchel_core::{AccessLevel, Error, CURRENT_VERSION};
use satchel_crypto::{
    pretty_fingerprint, AsymmetricCryptoManager, CryptoManager, MasterKey,
};

struct User {
    main: CryptoManager,
    identity: AsymmetricCryptoManager,
}

fn user(seed: u8) -> User {
    User {
        main: CryptoManager::main(&MasterKey::from_bytes([seed; 32]), CURRENT_VERSION).unwrap(),
        identity: AsymmetricCryptoManager::generate(),
    }
}

fn shared_collection(owner: &User) -> Collection {
    let meta = CollectionMeta {
        collection_type: "COLTYPE".into(),
        name: "Team notes".into(),
        description: Some("Shared with the team".into()),
        color: None,
    };
    Collection::create(&owner.main, &meta, b"meeting minutes").unwrap()
}

#[test]
fn sharing_roundtrip() {
    let alice = user(1);
    let bob = user(2);

    let collection = shared_collection(&alice);
    let invitation = SignedInvitation::invite(
        &collection,
        &alice.main,
        &alice.identity,
        &bob.identity.pubkey(),
        AccessLevel::ReadWrite,
    )
    .unwrap();

    // Bob confirms Alice's identity out-of-band: the fingerprint he
    // computes from the envelope matches what Alice reads aloud.
    assert_eq!(
        pretty_fingerprint(invitation.sender_pub()),
        pretty_fingerprint(&alice.identity.pubkey()),
    );

    let rewrapped = invitation.accept(&bob.identity, &bob.main).unwrap();
    let adopted =
        Collection::adopt(&collection.to_wire(), rewrapped, invitation.access_level()).unwrap();

    adopted.verify(&bob.main).unwrap();
    assert_eq!(adopted.decrypt_meta(&bob.main).unwrap().name, "Team notes");
    assert_eq!(
        adopted.decrypt_content(&bob.main).unwrap(),
        b"meeting minutes"
    );
    assert_eq!(adopted.access_level(), AccessLevel::ReadWrite);

    // Alice keeps her own access untouched
    collection.verify(&alice.main).unwrap();
}

#[test]
fn invitation_for_bob_is_useless_to_carol() {
    let alice = user(1);
    let bob = user(2);
    let carol = user(3);

    let collection = shared_collection(&alice);
    let invitation = SignedInvitation::invite(
        &collection,
        &alice.main,
        &alice.identity,
        &bob.identity.pubkey(),
        AccessLevel::ReadWrite,
    )
    .unwrap();

    assert!(matches!(
        invitation.accept(&carol.identity, &carol.main),
        Err(Error::Integrity(_))
    ));
}

#[test]
fn invitation_survives_the_wire() {
    let alice = user(1);
    let bob = user(2);

    let collection = shared_collection(&alice);
    let invitation = SignedInvitation::invite(
        &collection,
        &alice.main,
        &alice.identity,
        &bob.identity.pubkey(),
        AccessLevel::ReadOnly,
    )
    .unwrap();

    let json = serde_json::to_string(&invitation.to_wire()).unwrap();
    let restored = SignedInvitation::from_wire(&serde_json::from_str(&json).unwrap()).unwrap();

    restored.verify().unwrap();
    assert!(restored.accept(&bob.identity, &bob.main).is_ok());
}

#[test]
fn fingerprints_disagree_for_different_identities() {
    let alice = user(1);
    let mallory = user(4);

    assert_ne!(
        pretty_fingerprint(&alice.identity.pubkey()),
        pretty_fingerprint(&mallory.identity.pubkey()),
    );
}
