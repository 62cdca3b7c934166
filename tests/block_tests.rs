//! Block assembly, Merkle commitment, and persistence

use ledger_kernel::*;

fn tx_with_lock_time(lock_time: i32) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![TransactionInput {
            prev_tx_hash: [0xab; 32],
            output_index: 0,
            unlocking_script: ScriptBytes::new(vec![0x01, 0x00]).unwrap(),
            sequence: 0xffff_ffff,
        }],
        outputs: vec![TransactionOutput {
            value: 5000,
            locking_script: ScriptBytes::new(vec![0x76, 0x00]).unwrap(),
        }],
        lock_time,
    }
}

fn header() -> BlockHeader {
    BlockHeader {
        version: 1,
        prev_block_hash: [0x11; 32],
        merkle_root: [0; 32],
        timestamp: 1_700_000_000,
        difficulty_target: 0x1d00_ffff,
        nonce: 0,
    }
}

fn three_tx_block() -> Block {
    let txs = vec![tx_with_lock_time(1), tx_with_lock_time(2), tx_with_lock_time(3)];
    Block::new(header(), txs).unwrap()
}

#[test]
fn test_block_new_sets_merkle_root() {
    let block = three_tx_block();
    let ids = block.tx_hashes();

    let mut ab = ids[0].to_vec();
    ab.extend_from_slice(&ids[1]);
    let ab = hashes::double_sha256(&ab);

    let mut c0 = ids[2].to_vec();
    c0.extend_from_slice(&[0u8; 32]);
    let c0 = hashes::double_sha256(&c0);

    let mut root = ab.to_vec();
    root.extend_from_slice(&c0);
    let root = hashes::double_sha256(&root);

    assert_eq!(block.header.merkle_root, root);
    assert_eq!(block.merkle().unwrap().path, vec![ab, c0, root]);
    assert!(block.verify_merkle_root().unwrap());
}

#[test]
fn test_block_new_rejects_empty() {
    assert!(matches!(
        Block::new(header(), vec![]),
        Err(LedgerError::EmptyBlock)
    ));
}

#[test]
fn test_reordered_transactions_fail_check() {
    let mut block = three_tx_block();
    block.transactions.swap(0, 1);
    assert!(!block.verify_merkle_root().unwrap());

    let kernel = LedgerKernel::new();
    assert!(matches!(
        kernel.check_block(&block.encode()),
        Err(LedgerError::MerkleRootMismatch)
    ));
}

#[test]
fn test_check_block_roundtrip() {
    let block = three_tx_block();
    let kernel = LedgerKernel::new();
    let decoded = kernel.check_block(&block.encode()).unwrap();
    assert_eq!(decoded, block);
    assert_eq!(decoded.hash_hex(), block.hash_hex());
}

#[test]
fn test_block_with_no_transactions_decodes_but_fails_check() {
    let block = Block {
        size: 0,
        header: header(),
        transactions: vec![],
    };
    let kernel = LedgerKernel::new();
    let bytes = block.encode();
    assert!(kernel.decode_block(&bytes).is_ok());
    assert!(matches!(kernel.check_block(&bytes), Err(LedgerError::EmptyBlock)));
}

#[test]
fn test_block_hash_covers_header_and_transactions() {
    let block = three_tx_block();

    let mut other_nonce = block.clone();
    other_nonce.header.nonce += 1;
    assert_ne!(other_nonce.hash(), block.hash());
    assert_ne!(other_nonce.header.hash(), block.header.hash());

    let mut other_txs = block.clone();
    other_txs.transactions[2].lock_time = 99;
    assert_ne!(other_txs.hash(), block.hash());
    assert_eq!(other_txs.header.hash(), block.header.hash());
}

#[test]
fn test_decode_block_trailing_bytes() {
    let mut bytes = three_tx_block().encode();
    bytes.push(0);
    assert!(matches!(
        LedgerKernel::new().decode_block(&bytes),
        Err(LedgerError::Decode(DecodeError::TrailingBytes(1)))
    ));
}

#[test]
fn test_save_and_load_through_kernel() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let kernel = LedgerKernel::new();
    let store = MemoryStore::new();
    let block = three_tx_block();

    let hash_hex = kernel.save_block(&store, &block)?;
    assert!(store.contains(&block_key(&hash_hex)));

    let loaded = kernel.load_block(&store, &hash_hex)?;
    assert_eq!(loaded, block);
    assert!(loaded.verify_merkle_root()?);
    Ok(())
}

#[test]
fn test_load_unknown_block() {
    let kernel = LedgerKernel::new();
    let store = MemoryStore::new();
    let result = kernel.load_block(&store, &"00".repeat(32));
    assert!(matches!(
        result,
        Err(LedgerError::Storage(StorageError::NotFound(_)))
    ));
}

/// Backend that always fails, to check errors propagate untouched
struct BrokenStore;

impl BlockStore for BrokenStore {
    fn save(&self, _key: &str, _bytes: &[u8]) -> std::result::Result<(), StorageError> {
        Err(StorageError::Backend("disk full".to_string()))
    }

    fn get(&self, _key: &str) -> std::result::Result<Vec<u8>, StorageError> {
        Err(StorageError::Backend("disk unreadable".to_string()))
    }
}

#[test]
fn test_backend_errors_propagate() {
    let kernel = LedgerKernel::new();
    let block = three_tx_block();
    assert!(matches!(
        kernel.save_block(&BrokenStore, &block),
        Err(LedgerError::Storage(StorageError::Backend(msg))) if msg == "disk full"
    ));
    assert!(matches!(
        kernel.load_block(&BrokenStore, "00"),
        Err(LedgerError::Storage(StorageError::Backend(_)))
    ));
}

#[test]
fn test_memory_store_shared_across_threads() {
    use std::sync::Arc;
    use std::thread;

    let store = Arc::new(MemoryStore::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let block = Block::new(header(), vec![tx_with_lock_time(i)]).unwrap();
                LedgerKernel::new().save_block(&*store, &block).unwrap()
            })
        })
        .collect();

    let kernel = LedgerKernel::new();
    for handle in handles {
        let hash_hex = handle.join().unwrap();
        assert!(kernel.load_block(&*store, &hash_hex).is_ok());
    }
    assert_eq!(store.len(), 4);
}
