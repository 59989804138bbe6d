//! Whole-stack flow: two accounts, a shared collection, and a session
//! export in between.

use secrecy::SecretString;

use satchel_account::Account;
use satchel_collection::{Collection, CollectionMeta, Item, ItemMeta, SignedInvitation};
use satchel_core::AccessLevel;
use satchel_crypto::KdfParams;

fn params() -> KdfParams {
    KdfParams::insecure_for_tests()
}

fn signup(username: &str, password: &str) -> Account {
    Account::signup(
        username,
        None,
        &SecretString::from(password.to_string()),
        "https://sync.example.com",
        &params(),
    )
    .unwrap()
}

#[test]
fn account_owns_collections_across_sessions() {
    let account = signup("alice", "a long enough password");
    let main = account.main_crypto_manager().unwrap();

    let meta = CollectionMeta {
        collection_type: "COLTYPE".into(),
        name: "Journal".into(),
        description: None,
        color: None,
    };
    let collection = Collection::create(&main, &meta, b"day one").unwrap();
    let wire = collection.to_wire();

    // simulate app restart from the persisted session blob
    let restored_account = Account::restore(account.save()).unwrap();
    let restored_main = restored_account.main_crypto_manager().unwrap();

    let fetched = Collection::from_wire(&wire).unwrap();
    fetched.verify(&restored_main).unwrap();
    assert_eq!(fetched.decrypt_meta(&restored_main).unwrap().name, "Journal");
    assert_eq!(fetched.decrypt_content(&restored_main).unwrap(), b"day one");
}

#[test]
fn two_accounts_share_a_collection() {
    let alice = signup("alice", "alice's long password");
    let bob = signup("bob", "bob's long password");

    let alice_main = alice.main_crypto_manager().unwrap();
    let bob_main = bob.main_crypto_manager().unwrap();

    let meta = CollectionMeta {
        collection_type: "COLTYPE".into(),
        name: "Trip plans".into(),
        description: Some("Summer".into()),
        color: Some("#00ff00".into()),
    };
    let collection = Collection::create(&alice_main, &meta, b"itinerary").unwrap();

    // Alice puts an item in before sharing
    let col_cm = collection.crypto_manager(&alice_main).unwrap();
    let item = Item::create(
        &col_cm,
        &ItemMeta {
            item_type: "doc".into(),
            name: Some("flights".into()),
            mtime: None,
        },
        b"AB123 10:40",
    )
    .unwrap();
    let item_wire = item.to_wire();

    let invitation = SignedInvitation::invite(
        &collection,
        &alice_main,
        alice.identity(),
        &bob.identity().pubkey(),
        AccessLevel::ReadWrite,
    )
    .unwrap();

    // Bob compares fingerprints out-of-band before accepting
    assert_eq!(
        satchel_crypto::pretty_fingerprint(invitation.sender_pub()),
        alice.fingerprint(),
    );

    let rewrapped = invitation.accept(bob.identity(), &bob_main).unwrap();
    let shared =
        Collection::adopt(&collection.to_wire(), rewrapped, invitation.access_level()).unwrap();

    shared.verify(&bob_main).unwrap();
    assert_eq!(shared.decrypt_content(&bob_main).unwrap(), b"itinerary");

    // Bob reaches the item through the shared collection key
    let bob_col_cm = shared.crypto_manager(&bob_main).unwrap();
    let fetched_item = Item::from_wire(&item_wire).unwrap();
    fetched_item.verify(&bob_col_cm).unwrap();
    assert_eq!(
        fetched_item.decrypt_content(&bob_col_cm).unwrap(),
        b"AB123 10:40"
    );
}

#[test]
fn password_change_keeps_collections_reachable() {
    let mut account = signup("alice", "original password here");
    let main = account.main_crypto_manager().unwrap();

    let meta = CollectionMeta {
        collection_type: "COLTYPE".into(),
        name: "Notes".into(),
        description: None,
        color: None,
    };
    let collection = Collection::create(&main, &meta, b"remember this").unwrap();
    let wire = collection.to_wire();

    let new_profile = account
        .change_password(&SecretString::from("rotated password now"), &params())
        .unwrap();

    // the master key is password-derived, so a fresh login under the
    // new password reaches the same collections
    let (account, _) = Account::login(
        new_profile,
        &SecretString::from("rotated password now"),
        b"challenge",
        "https://sync.example.com",
        &params(),
    )
    .unwrap();
    let main = account.main_crypto_manager().unwrap();

    let fetched = Collection::from_wire(&wire).unwrap();
    assert_eq!(
        fetched.decrypt_content(&main).unwrap(),
        b"remember this"
    );
}
