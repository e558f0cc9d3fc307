use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Datelike, Utc};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    Error, Res,
    spotify::{Gateway, RequestOptions},
    types::{Album, AlbumRef, Decade, DecadeBucket, SavedTracksPage, SyncProgress, TrackItem},
};

/// Largest page `GET /me/tracks` accepts.
pub const PAGE_SIZE: u64 = 50;

/// Capacity of the event channel handed out by [`LibrarySync::spawn`].
const EVENT_BUFFER: usize = 64;

/// Incremental output of a library scan, in emission order per page:
/// tracks, new albums, newly ready decades, then progress.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    TracksLoaded(Vec<TrackItem>),
    /// Albums not seen earlier in this scan. Never repeats an album.
    AlbumsDiscovered(Vec<Album>),
    DecadeReady(Decade),
    Progress(SyncProgress),
    /// Last event of a scan that ran to the end.
    Finished(LibrarySnapshot),
}

/// Everything a scan has collected so far.
#[derive(Debug, Clone, PartialEq)]
pub struct LibrarySnapshot {
    pub progress: SyncProgress,
    pub tracks: Vec<TrackItem>,
    pub albums: Vec<Album>,
    pub buckets: Vec<DecadeBucket>,
    /// Set once the last page has been processed. Buckets still unready at
    /// that point are final, possibly empty.
    pub complete: bool,
    /// Saved dates were not newest-first, so readiness stopped being inferred.
    pub ordering_violated: bool,
}

impl LibrarySnapshot {
    pub fn bucket(&self, decade: Decade) -> Option<&DecadeBucket> {
        self.buckets.iter().find(|b| b.decade == decade)
    }
}

/// Classifies saved-track pages as they arrive.
///
/// Relies on the provider returning saved tracks most recently saved first.
/// Seeing a track saved in year `Y` then proves that every bucket starting
/// after `Y` is complete, since nothing saved later can still show up and
/// nothing released in that decade could have been saved before it. The
/// `classic` bucket has no start year and is never declared ready mid-scan.
///
/// If a saved date goes backwards in time the assumption is broken: the scan
/// logs it, stops inferring readiness and leaves the rest to the end of the
/// scan.
#[derive(Debug)]
pub struct LibraryScan {
    seen_albums: HashSet<String>,
    progress: SyncProgress,
    tracks: Vec<TrackItem>,
    albums: Vec<Album>,
    buckets: Vec<DecadeBucket>,
    last_added: Option<DateTime<Utc>>,
    ordering_violated: bool,
}

impl Default for LibraryScan {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryScan {
    pub fn new() -> Self {
        Self {
            seen_albums: HashSet::new(),
            progress: SyncProgress {
                loaded: 0,
                total: None,
            },
            tracks: Vec::new(),
            albums: Vec::new(),
            buckets: Decade::ALL.into_iter().map(DecadeBucket::new).collect(),
            last_added: None,
            ordering_violated: false,
        }
    }

    /// Items folded in so far and the total reported by the first page.
    pub fn progress(&self) -> SyncProgress {
        self.progress
    }

    pub fn is_ready(&self, decade: Decade) -> bool {
        self.buckets.iter().any(|b| b.decade == decade && b.ready)
    }

    /// Folds one page into the scan and returns the events it produced.
    pub fn ingest_page(&mut self, page: &SavedTracksPage) -> Vec<SyncEvent> {
        if self.progress.total.is_none() {
            self.progress.total = Some(page.total);
        }

        let mut tracks = Vec::new();
        let mut new_albums = Vec::new();
        let mut ready = Vec::new();

        for item in &page.items {
            self.observe_saved_at(item.added_at, &mut ready);

            let Some(track) = &item.track else { continue };

            if let Some(album) = Album::from_object(&track.album) {
                if self.seen_albums.insert(album.id.clone()) {
                    let decade = album.decade();
                    if let Some(bucket) = self.buckets.iter_mut().find(|b| b.decade == decade) {
                        bucket.albums.push(album.clone());
                    }
                    new_albums.push(album);
                }
            }

            let Some(id) = &track.id else { continue };
            tracks.push(TrackItem {
                id: id.clone(),
                name: track.name.clone(),
                duration_ms: track.duration_ms,
                added_at: item.added_at,
                album: AlbumRef {
                    id: track.album.id.clone().unwrap_or_default(),
                    name: track.album.name.clone(),
                },
            });
        }

        self.progress.loaded += page.items.len() as u64;
        self.albums.extend(new_albums.iter().cloned());
        self.tracks.extend(tracks.iter().cloned());

        let mut events = Vec::with_capacity(3 + ready.len());
        if !tracks.is_empty() {
            events.push(SyncEvent::TracksLoaded(tracks));
        }
        if !new_albums.is_empty() {
            events.push(SyncEvent::AlbumsDiscovered(new_albums));
        }
        events.extend(ready.into_iter().map(SyncEvent::DecadeReady));
        events.push(SyncEvent::Progress(self.progress));
        events
    }

    /// Copies the current state without ending the scan.
    ///
    /// # Returns
    ///
    /// A snapshot with `complete` set to `false`, even if the last page has
    /// already been ingested. Only [`finish`](Self::finish) marks it complete.
    pub fn snapshot(&self) -> LibrarySnapshot {
        LibrarySnapshot {
            progress: self.progress,
            tracks: self.tracks.clone(),
            albums: self.albums.clone(),
            buckets: self.buckets.clone(),
            complete: false,
            ordering_violated: self.ordering_violated,
        }
    }

    /// Ends the scan. Ready flags are left as they are.
    pub fn finish(self) -> LibrarySnapshot {
        LibrarySnapshot {
            progress: self.progress,
            tracks: self.tracks,
            albums: self.albums,
            buckets: self.buckets,
            complete: true,
            ordering_violated: self.ordering_violated,
        }
    }

    fn observe_saved_at(&mut self, added_at: DateTime<Utc>, ready: &mut Vec<Decade>) {
        if let Some(previous) = self.last_added {
            if added_at > previous && !self.ordering_violated {
                log::warn!(
                    "saved tracks out of order ({added_at} after {previous}), \
                     decade readiness deferred to end of scan"
                );
                self.ordering_violated = true;
            }
        }
        self.last_added = Some(added_at);

        if self.ordering_violated {
            return;
        }

        let year = added_at.year();
        for bucket in self.buckets.iter_mut().filter(|b| !b.ready) {
            if bucket.decade.start_year().is_some_and(|start| year < start) {
                bucket.ready = true;
                ready.push(bucket.decade);
            }
        }
    }
}

/// Walks the whole saved-track collection through the [`Gateway`].
///
/// Pages are requested strictly one after another; the next offset is only
/// requested once the previous page has been folded in and its events
/// delivered.
#[derive(Clone)]
pub struct LibrarySync {
    gateway: Arc<Gateway>,
}

impl LibrarySync {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Runs a full scan, sending every event to `events`.
    ///
    /// # Errors
    ///
    /// Any gateway failure aborts the scan. [`Error::Cancelled`] is returned
    /// when the receiving side of `events` is dropped.
    pub async fn run(&self, events: mpsc::Sender<SyncEvent>) -> Res<LibrarySnapshot> {
        let mut scan = LibraryScan::new();
        let mut offset = 0;
        let mut total: Option<u64> = None;

        while total.is_none_or(|t| offset < t) {
            let page = self.fetch_page(offset).await?;
            log::debug!(
                "saved tracks page offset={} items={} total={}",
                offset,
                page.items.len(),
                page.total
            );
            if total.is_none() {
                total = Some(page.total);
            }

            for event in scan.ingest_page(&page) {
                events.send(event).await.map_err(|_| Error::Cancelled)?;
            }
            offset += PAGE_SIZE;
        }

        let snapshot = scan.finish();
        events
            .send(SyncEvent::Finished(snapshot.clone()))
            .await
            .map_err(|_| Error::Cancelled)?;
        Ok(snapshot)
    }

    /// Runs a scan on its own task. Drop the receiver to abort it.
    pub fn spawn(self) -> (mpsc::Receiver<SyncEvent>, JoinHandle<Res<LibrarySnapshot>>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let handle = tokio::spawn(async move { self.run(tx).await });
        (rx, handle)
    }

    /// Runs a scan, discarding intermediate events.
    ///
    /// # Example
    ///
    /// ```
    /// let snapshot = LibrarySync::new(gateway).collect().await?;
    /// for bucket in &snapshot.buckets {
    ///     println!("{}: {} albums", bucket.decade, bucket.albums.len());
    /// }
    /// ```
    pub async fn collect(&self) -> Res<LibrarySnapshot> {
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let drain = async { while rx.recv().await.is_some() {} };
        let (snapshot, ()) = tokio::join!(self.run(tx), drain);
        snapshot
    }

    async fn fetch_page(&self, offset: u64) -> Res<SavedTracksPage> {
        let options = RequestOptions::get()
            .query("limit", PAGE_SIZE)
            .query("offset", offset);

        self.gateway
            .fetch::<SavedTracksPage>("/me/tracks", options)
            .await?
            .ok_or_else(|| Error::Api {
                status: 204,
                message: "saved tracks page had no body".to_string(),
            })
    }
}
