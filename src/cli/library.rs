use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;

use crate::{
    cli::{Session, fail},
    error, info,
    spotify::{LibrarySnapshot, LibrarySync, SyncEvent},
    success,
    types::{AlbumTableRow, Decade},
    utils, warning,
};

/// Scans the saved-track library and prints the albums of each decade.
///
/// With `only` set, just that decade's table is printed.
pub async fn library(session: &Session, only: Option<Decade>) {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Fetching saved tracks...");

    let (mut events, handle) = LibrarySync::new(session.gateway.clone()).spawn();

    let mut albums_seen = 0usize;
    while let Some(event) = events.recv().await {
        match event {
            SyncEvent::Progress(progress) => {
                if let Some(total) = progress.total {
                    pb.set_length(total);
                }
                pb.set_position(progress.loaded);
            }
            SyncEvent::AlbumsDiscovered(albums) => {
                albums_seen += albums.len();
                pb.set_message(format!("{albums_seen} albums"));
            }
            SyncEvent::DecadeReady(decade) => {
                pb.println(format!("{decade} complete"));
            }
            SyncEvent::TracksLoaded(_) | SyncEvent::Finished(_) => {}
        }
    }
    pb.finish_and_clear();

    let snapshot = match handle.await {
        Ok(Ok(snapshot)) => snapshot,
        Ok(Err(e)) => fail(e),
        Err(e) => error!("Library sync task failed: {}", e),
    };

    print_decades(&snapshot, only);
    success!(
        "{} saved tracks across {} albums.",
        snapshot.progress.loaded,
        snapshot.albums.len()
    );
}

fn print_decades(snapshot: &LibrarySnapshot, only: Option<Decade>) {
    if snapshot.ordering_violated {
        warning!("Saved tracks arrived out of order; decades were only finalized at the end.");
    }

    for bucket in &snapshot.buckets {
        if only.is_some_and(|d| d != bucket.decade) {
            continue;
        }
        if bucket.albums.is_empty() {
            info!("{}: no albums", bucket.decade);
            continue;
        }

        let mut albums = bucket.albums.clone();
        utils::sort_albums_by_release(&mut albums);
        let rows: Vec<AlbumTableRow> = albums.iter().map(AlbumTableRow::from).collect();
        let count = rows.len();

        println!("{} ({} albums)\n{}\n", bucket.decade, count, Table::new(rows));
    }
}
