#![no_main]

use hll_counter::HyperLogLog;
use libfuzzer_sys::fuzz_target;
use wyhash::WyHash;

fuzz_target!(|data: &[u8]| {
    let Some((&log2m, data)) = data.split_first() else {
        return;
    };
    let Ok(mut hll) = HyperLogLog::<WyHash>::with_log2m(log2m % 20 + 1) else {
        return;
    };
    let m = hll.registers().count();
    let max_rank = 32 - u32::from(hll.precision().log2m()) + 1;

    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        let hash = u32::from_le_bytes(word);

        let before: Vec<u32> = hll.registers().iter().collect();
        let changed = hll.offer_hashed(hash);
        let after: Vec<u32> = hll.registers().iter().collect();

        // registers never decrease and stay within rank bounds
        assert!(before.iter().zip(&after).all(|(b, a)| b <= a));
        assert_eq!(changed, before != after);
        assert!(after.iter().all(|&rank| rank <= max_rank));
        assert!(!hll.offer_hashed(hash));
        assert!(hll.cardinality() > 0);
    }

    assert_eq!(hll.registers().iter().count(), m);
    assert!(hll.registers().get(m).is_err());
});
