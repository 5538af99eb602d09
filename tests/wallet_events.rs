//! Unsolicited wallet events: in-place updates, implicit disconnects, stale
//! epochs and deferral during transitions.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use piggybank_connect::connector::{Connection, WalletEvent};
use piggybank_connect::session::SessionStatus;
use piggybank_connect::storage::MemorySessionStore;
use piggybank_connect::{ChainId, WalletError};

mod common;
use common::{account, MockConnector, Step, MAINNET, SEPOLIA};

#[tokio::test]
async fn test_account_change_updates_in_place() {
    let wallet = MockConnector::new("injected", account(1));
    let store = Arc::new(MemorySessionStore::new());
    let manager = common::start_manager(wallet.clone(), store.clone());
    let handle = manager.handle();

    handle.connect("injected", Some(MAINNET)).await.unwrap();
    common::wait_status(&handle, SessionStatus::Connected).await;
    let mut changes = handle.subscribe();

    assert!(wallet.emit(WalletEvent::AccountsChanged(Some(account(2)))));
    let session = changes.recv().await.unwrap();
    assert_eq!(session.status, SessionStatus::Connected);
    assert_eq!(session.account, Some(account(2)));
    assert_eq!(store.get().unwrap().account, account(2));

    // Same account again is a no-op.
    wallet.emit(WalletEvent::AccountsChanged(Some(account(2))));
    common::settle(&handle).await;
    assert!(changes.try_recv().is_err());
}

#[tokio::test]
async fn test_chain_change_updates_in_place() {
    let wallet = MockConnector::new("injected", account(1));
    let store = Arc::new(MemorySessionStore::new());
    let manager = common::start_manager(wallet.clone(), store.clone());
    let handle = manager.handle();

    handle.connect("injected", Some(MAINNET)).await.unwrap();
    common::wait_status(&handle, SessionStatus::Connected).await;
    let mut changes = handle.subscribe();

    wallet.emit(WalletEvent::ChainChanged(SEPOLIA));
    let session = changes.recv().await.unwrap();
    assert_eq!(session.chain_id, Some(SEPOLIA));
    assert_eq!(session.account, Some(account(1)));
    assert_eq!(store.get().unwrap().chain_id, SEPOLIA);
}

#[tokio::test]
async fn test_chain_change_to_unregistered_chain() {
    let wallet = MockConnector::new("injected", account(1));
    let store = Arc::new(MemorySessionStore::new());
    let manager = common::start_manager(wallet.clone(), store.clone());
    let handle = manager.handle();

    handle.connect("injected", Some(MAINNET)).await.unwrap();
    common::wait_status(&handle, SessionStatus::Connected).await;

    wallet.emit(WalletEvent::ChainChanged(ChainId(250)));
    let session = common::wait_status(&handle, SessionStatus::Error).await;
    assert_eq!(session.last_error, Some(WalletError::UnknownChain(ChainId(250)).to_string()));
    assert_eq!(session.account, None);
    assert_eq!(store.get(), None);
    assert_eq!(wallet.teardowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_revoked_accounts_disconnect() {
    let wallet = MockConnector::new("injected", account(1));
    let store = Arc::new(MemorySessionStore::new());
    let manager = common::start_manager(wallet.clone(), store.clone());
    let handle = manager.handle();

    handle.connect("injected", None).await.unwrap();
    common::wait_status(&handle, SessionStatus::Connected).await;

    wallet.emit(WalletEvent::AccountsChanged(None));
    common::wait_status(&handle, SessionStatus::Disconnected).await;
    assert_eq!(store.get(), None);
    assert_eq!(wallet.teardowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_wallet_disconnect_event() {
    let wallet = MockConnector::new("injected", account(1));
    let manager = common::start_manager(wallet.clone(), Arc::new(MemorySessionStore::new()));
    let handle = manager.handle();

    handle.connect("injected", None).await.unwrap();
    common::wait_status(&handle, SessionStatus::Connected).await;

    wallet.emit(WalletEvent::Disconnected);
    common::wait_status(&handle, SessionStatus::Disconnected).await;
}

#[tokio::test]
async fn test_events_from_previous_attempt_are_dropped() {
    let wallet = MockConnector::new("injected", account(1));
    let manager = common::start_manager(wallet.clone(), Arc::new(MemorySessionStore::new()));
    let handle = manager.handle();

    handle.connect("injected", Some(MAINNET)).await.unwrap();
    common::wait_status(&handle, SessionStatus::Connected).await;
    let stale = wallet.sink();

    handle.disconnect().await.unwrap();
    handle.connect("injected", Some(MAINNET)).await.unwrap();
    common::wait_status(&handle, SessionStatus::Connected).await;
    assert!(wallet.sink().epoch() > stale.epoch());

    stale.accounts_changed(Some(account(9)));
    stale.chain_changed(SEPOLIA);
    common::settle(&handle).await;

    let session = handle.snapshot();
    assert_eq!(session.account, Some(account(1)));
    assert_eq!(session.chain_id, Some(MAINNET));
}

#[tokio::test]
async fn test_events_during_connecting_are_replayed() {
    let wallet = MockConnector::new("injected", account(1));
    wallet.on_connect(Step::EmitThen(
        WalletEvent::ChainChanged(SEPOLIA),
        Ok(Connection {
            accounts: vec![account(1)],
            chain_id: MAINNET,
        }),
    ));
    let store = Arc::new(MemorySessionStore::new());
    let manager = common::start_manager(wallet.clone(), store.clone());
    let handle = manager.handle();
    let mut changes = handle.subscribe();

    handle.connect("injected", Some(MAINNET)).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let session = changes.recv().await.unwrap();
        seen.push((session.status, session.chain_id));
    }
    assert_eq!(
        seen,
        vec![
            (SessionStatus::Connecting, Some(MAINNET)),
            (SessionStatus::Connected, Some(MAINNET)),
            (SessionStatus::Connected, Some(SEPOLIA)),
        ]
    );
    assert_eq!(store.get().unwrap().chain_id, SEPOLIA);
}

#[tokio::test]
async fn test_events_ignored_outside_connected() {
    let wallet = MockConnector::new("injected", account(1));
    wallet.on_connect(Step::EmitThen(
        WalletEvent::AccountsChanged(Some(account(3))),
        Err(piggybank_connect::connector::ConnectorError::UserRejected),
    ));
    let manager = common::start_manager(wallet.clone(), Arc::new(MemorySessionStore::new()));
    let handle = manager.handle();

    handle.connect("injected", None).await.unwrap();
    common::wait_status(&handle, SessionStatus::Disconnected).await;
    common::settle(&handle).await;

    let session = handle.snapshot();
    assert_eq!(session.status, SessionStatus::Disconnected);
    assert_eq!(session.account, None);
}
