#![no_main]

use bingo_room_client::board::{normalize_board, normalize_marks, BoardRepair, CELL_COUNT};
use bingo_room_client::projection::{BoardCache, RoomProjection};
use bingo_room_client::win::has_bingo;
use bingo_room_client::{Room, WordPool};
use libfuzzer_sys::fuzz_target;
use rand::rngs::StdRng;
use rand::SeedableRng;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    // Lenient decoding must accept any JSON value.
    let room = Room::from_value(&value);
    let pool = WordPool::new();
    let mut rng = StdRng::seed_from_u64(0);

    for (id, player) in &room.players {
        let (board, repair) = normalize_board(player.board.clone(), &pool, &mut rng);
        assert_eq!(board.len(), CELL_COUNT);
        if player.board.len() == CELL_COUNT {
            assert_ne!(repair, BoardRepair::Regenerated);
        }
        let _ = has_bingo(&normalize_marks(player.marks.clone()));

        let _ = RoomProjection::build("FUZZ0", &room, id, 0, &mut BoardCache::default(), &pool, &mut rng);
    }

    // The strict path may reject, but must not panic.
    let _ = serde_json::from_value::<Room>(value);
});
