//! Like ledger behavior under concurrent toggles against a file-backed pool.

use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;

use tuiter::db::{self, models::{Attachments, Role}};
use tuiter::likes;
use tuiter::state::DbPool;

fn setup() -> (TempDir, DbPool, String, Vec<String>) {
    let tmp = TempDir::new().unwrap();
    let pool = db::create_pool(&tmp.path().join("ledger.db")).unwrap();
    db::run_migrations(&pool).unwrap();

    let conn = pool.get().unwrap();
    let author = db::users::insert(&conn, "author", "d", Role::Regular, None).unwrap();
    let tuit = db::tuits::insert(&conn, &author.id, "hello", &Attachments::default()).unwrap();
    let fans = (0..4)
        .map(|i| {
            db::users::insert(&conn, &format!("fan{i}"), "d", Role::Regular, None)
                .unwrap()
                .id
        })
        .collect();
    drop(conn);

    (tmp, pool, tuit.id, fans)
}

fn records_for(pool: &DbPool, tuit_id: &str, user_id: &str) -> i64 {
    let conn = pool.get().unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE tuit_id = ?1 AND user_id = ?2",
        rusqlite::params![tuit_id, user_id],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn concurrent_toggles_never_duplicate_a_like() {
    let (_tmp, pool, tuit_id, fans) = setup();
    let user_id = fans[0].clone();
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let pool = pool.clone();
            let barrier = barrier.clone();
            let (tuit_id, user_id) = (tuit_id.clone(), user_id.clone());
            thread::spawn(move || {
                let conn = pool.get().unwrap();
                barrier.wait();
                for _ in 0..10 {
                    likes::toggle_like(&conn, &user_id, &tuit_id).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(records_for(&pool, &tuit_id, &user_id) <= 1);

    // One more toggle settles like_count against the records.
    let conn = pool.get().unwrap();
    let outcome = likes::toggle_like(&conn, &user_id, &tuit_id).unwrap();
    let stored = db::tuits::find_by_id(&conn, &tuit_id).unwrap().unwrap();
    assert_eq!(stored.like_count, outcome.like_count);
    assert_eq!(outcome.like_count, db::likes::count_for_tuit(&conn, &tuit_id).unwrap());
}

#[test]
fn concurrent_likes_from_distinct_users_all_count() {
    let (_tmp, pool, tuit_id, fans) = setup();
    let barrier = Arc::new(Barrier::new(fans.len()));

    let handles: Vec<_> = fans
        .iter()
        .cloned()
        .map(|user_id| {
            let pool = pool.clone();
            let barrier = barrier.clone();
            let tuit_id = tuit_id.clone();
            thread::spawn(move || {
                let conn = pool.get().unwrap();
                barrier.wait();
                likes::toggle_like(&conn, &user_id, &tuit_id).unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().state, likes::LikeState::Liked);
    }

    let conn = pool.get().unwrap();
    assert_eq!(db::likes::count_for_tuit(&conn, &tuit_id).unwrap(), 4);
    // A recount after the dust settles always agrees with the records.
    assert_eq!(likes::recount(&conn, &tuit_id).unwrap(), 4);
    assert_eq!(db::tuits::find_by_id(&conn, &tuit_id).unwrap().unwrap().like_count, 4);
}
