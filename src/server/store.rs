//! In-memory movie/showtime store backed by a flat JSON file.
//!
//! A single mutex guards the dataset for the whole read-modify-write
//! sequence of a booking, so two callers racing for the last seats cannot
//! both succeed. Mutations are written back to the file before the lock is
//! released; a failed write is logged and the in-memory state kept.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::log_error;

/// Seat accounting for one showtime. `available` counts remaining seats and
/// decreases with each booking; `total` never changes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Seats {
    pub available: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Showtime {
    pub show_id: String,
    pub time: String,
    pub theatre_name: String,
    pub seats: Seats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub movie_id: String,
    pub name: String,
    pub genre: String,
    pub location: String,
    #[serde(default)]
    pub showtimes: Vec<Showtime>,
}

/// Movie without its showtimes, as returned by `list_movies`.
#[derive(Debug, Clone, Serialize)]
pub struct MovieSummary {
    pub movie_id: String,
    pub name: String,
    pub genre: String,
    pub location: String,
}

/// One showtime row as returned by `get_showtimes`. Carries the location so
/// results stay unambiguous when no location filter was given.
#[derive(Debug, Clone, Serialize)]
pub struct ShowtimeView {
    pub show_id: String,
    pub time: String,
    pub theatre_name: String,
    pub location: String,
    pub seats: Seats,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieShowtimes {
    pub movie: String,
    pub showtimes: Vec<ShowtimeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub success: bool,
    pub message: String,
    pub remaining: u32,
}

/// Domain failures reported back to the tool caller. None of these are fatal
/// and none of them leave the dataset mutated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no showtimes found for '{0}'")]
    MovieNotFound(String),
    #[error("show '{0}' not found")]
    ShowNotFound(String),
    #[error("seats must be greater than 0")]
    InvalidSeatCount,
    #[error("only {available} seats available")]
    CapacityExceeded { available: u32 },
}

impl StoreError {
    /// Stable machine-readable discriminant for structured error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::MovieNotFound(_) => "not_found",
            StoreError::ShowNotFound(_) => "not_found",
            StoreError::InvalidSeatCount => "invalid_argument",
            StoreError::CapacityExceeded { .. } => "capacity_exceeded",
        }
    }
}

#[derive(Debug)]
pub struct MovieStore {
    path: PathBuf,
    movies: Mutex<Vec<Movie>>,
}

impl MovieStore {
    /// Load the dataset from `path`. Failure here is fatal at startup.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read dataset: {}", path.display()))?;
        let movies: Vec<Movie> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse dataset: {}", path.display()))?;
        Ok(Self {
            path,
            movies: Mutex::new(movies),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Movies playing in `location` (case-insensitive), or every movie when
    /// no filter is given. An empty result is not an error.
    pub fn list_movies(&self, location: Option<&str>) -> Vec<MovieSummary> {
        let movies = self.movies.lock().expect("movie store lock poisoned");
        movies
            .iter()
            .filter(|m| match location {
                Some(loc) => m.location.eq_ignore_ascii_case(loc.trim()),
                None => true,
            })
            .map(|m| MovieSummary {
                movie_id: m.movie_id.clone(),
                name: m.name.clone(),
                genre: m.genre.clone(),
                location: m.location.clone(),
            })
            .collect()
    }

    /// Showtimes for the named movie, optionally restricted to a location.
    /// Fails with `MovieNotFound` when nothing matches.
    pub fn showtimes_for(
        &self,
        movie_name: &str,
        location: Option<&str>,
    ) -> Result<MovieShowtimes, StoreError> {
        let movies = self.movies.lock().expect("movie store lock poisoned");
        let name = movie_name.trim();

        let mut display_name = None;
        let mut rows = Vec::new();
        for m in movies.iter() {
            if !m.name.eq_ignore_ascii_case(name) {
                continue;
            }
            if let Some(loc) = location
                && !m.location.eq_ignore_ascii_case(loc.trim())
            {
                continue;
            }
            display_name.get_or_insert_with(|| m.name.clone());
            for s in &m.showtimes {
                rows.push(ShowtimeView {
                    show_id: s.show_id.clone(),
                    time: s.time.clone(),
                    theatre_name: s.theatre_name.clone(),
                    location: m.location.clone(),
                    seats: s.seats,
                });
            }
        }

        match display_name {
            Some(movie) => Ok(MovieShowtimes {
                movie,
                showtimes: rows,
            }),
            None => Err(StoreError::MovieNotFound(name.to_string())),
        }
    }

    /// Book `seats` seats on `show_id` (case-insensitive). On success the
    /// remaining count is decremented and the dataset persisted; every
    /// failure leaves the dataset untouched.
    pub fn book(&self, show_id: &str, seats: i64) -> Result<BookingReceipt, StoreError> {
        if seats <= 0 {
            return Err(StoreError::InvalidSeatCount);
        }
        let sid = show_id.trim();

        let mut movies = self.movies.lock().expect("movie store lock poisoned");
        let located = movies.iter().enumerate().find_map(|(mi, movie)| {
            movie
                .showtimes
                .iter()
                .position(|s| s.show_id.eq_ignore_ascii_case(sid))
                .map(|si| (mi, si))
        });
        let Some((mi, si)) = located else {
            return Err(StoreError::ShowNotFound(sid.to_string()));
        };

        let show = &mut movies[mi].showtimes[si];
        let available = show.seats.available;
        if seats > i64::from(available) {
            return Err(StoreError::CapacityExceeded { available });
        }
        show.seats.available = available - seats as u32;
        let remaining = show.seats.available;
        let canonical_id = show.show_id.clone();

        self.persist(&movies);
        Ok(BookingReceipt {
            success: true,
            message: format!("{seats} seats booked for show {canonical_id}"),
            remaining,
        })
    }

    /// Write the dataset back to disk. Best-effort: a failure is logged and
    /// the in-memory mutation kept. Called with the lock held.
    fn persist(&self, movies: &[Movie]) {
        let serialized = match serde_json::to_string_pretty(movies) {
            Ok(s) => s,
            Err(e) => {
                log_error!("failed to serialize dataset: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, serialized) {
            log_error!("failed to persist dataset to {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    const SAMPLE: &str = r#"[
      {
        "movie_id": "mov001",
        "name": "Inception",
        "genre": "Sci-Fi",
        "location": "Delhi",
        "showtimes": [
          { "show_id": "show001", "time": "18:30", "theatre_name": "PVR Select Citywalk",
            "seats": { "available": 42, "total": 50 } },
          { "show_id": "show002", "time": "21:30", "theatre_name": "PVR Select Citywalk",
            "seats": { "available": 3, "total": 50 } }
        ]
      },
      {
        "movie_id": "mov002",
        "name": "Inception",
        "genre": "Sci-Fi",
        "location": "Mumbai",
        "showtimes": [
          { "show_id": "show003", "time": "19:00", "theatre_name": "Regal",
            "seats": { "available": 10, "total": 40 } }
        ]
      },
      {
        "movie_id": "mov003",
        "name": "Jawan",
        "genre": "Action",
        "location": "Delhi",
        "showtimes": []
      }
    ]"#;

    fn sample_store() -> (tempfile::TempDir, MovieStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(SAMPLE.as_bytes()).unwrap();
        let store = MovieStore::load(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn load_missing_file_fails() {
        let err = MovieStore::load("/nonexistent/data.json").unwrap_err();
        assert!(err.to_string().contains("failed to read dataset"));
    }

    #[test]
    fn list_movies_filters_by_location() {
        let (_dir, store) = sample_store();
        let delhi = store.list_movies(Some("Delhi"));
        assert_eq!(delhi.len(), 2);
        assert!(delhi.iter().all(|m| m.location == "Delhi"));

        // case-insensitive
        let delhi_lower = store.list_movies(Some("delhi"));
        assert_eq!(delhi_lower.len(), 2);

        let all = store.list_movies(None);
        assert_eq!(all.len(), 3);

        // no match -> empty, not an error
        assert!(store.list_movies(Some("Chennai")).is_empty());
    }

    #[test]
    fn showtimes_by_name_and_location() {
        let (_dir, store) = sample_store();
        let res = store.showtimes_for("inception", Some("Delhi")).unwrap();
        assert_eq!(res.movie, "Inception");
        assert_eq!(res.showtimes.len(), 2);
        assert_eq!(res.showtimes[0].show_id, "show001");

        // without a location filter, both cities contribute rows
        let all = store.showtimes_for("Inception", None).unwrap();
        assert_eq!(all.showtimes.len(), 3);
    }

    #[test]
    fn showtimes_unknown_movie_is_not_found() {
        let (_dir, store) = sample_store();
        let err = store.showtimes_for("Tenet", Some("Delhi")).unwrap_err();
        assert_eq!(err, StoreError::MovieNotFound("Tenet".into()));
        // known movie, wrong city
        let err = store.showtimes_for("Jawan", Some("Mumbai")).unwrap_err();
        assert!(matches!(err, StoreError::MovieNotFound(_)));
    }

    #[test]
    fn booking_decrements_remaining() {
        let (_dir, store) = sample_store();
        let receipt = store.book("show001", 2).unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.remaining, 40);
        assert_eq!(receipt.message, "2 seats booked for show show001");

        // follow-up booking sees the decremented count
        let receipt = store.book("SHOW001", 40).unwrap();
        assert_eq!(receipt.remaining, 0);
    }

    #[test]
    fn booking_rejects_non_positive_seats() {
        let (_dir, store) = sample_store();
        assert_eq!(store.book("show001", 0).unwrap_err(), StoreError::InvalidSeatCount);
        assert_eq!(store.book("show001", -3).unwrap_err(), StoreError::InvalidSeatCount);
        // untouched
        let res = store.showtimes_for("Inception", Some("Delhi")).unwrap();
        assert_eq!(res.showtimes[0].seats.available, 42);
    }

    #[test]
    fn booking_rejects_over_capacity_without_mutation() {
        let (_dir, store) = sample_store();
        let err = store.book("show002", 4).unwrap_err();
        assert_eq!(err, StoreError::CapacityExceeded { available: 3 });
        let res = store.showtimes_for("Inception", Some("Delhi")).unwrap();
        assert_eq!(res.showtimes[1].seats.available, 3);
    }

    #[test]
    fn booking_unknown_show_is_not_found() {
        let (_dir, store) = sample_store();
        let err = store.book("show999", 1).unwrap_err();
        assert_eq!(err, StoreError::ShowNotFound("show999".into()));
    }

    #[test]
    fn booking_persists_to_disk() {
        let (dir, store) = sample_store();
        store.book("show001", 5).unwrap();
        drop(store);

        let reloaded = MovieStore::load(dir.path().join("data.json")).unwrap();
        let res = reloaded.showtimes_for("Inception", Some("Delhi")).unwrap();
        assert_eq!(res.showtimes[0].seats.available, 37);
        assert_eq!(res.showtimes[0].seats.total, 50);
    }

    #[test]
    fn concurrent_over_capacity_bookings_admit_exactly_one() {
        let (_dir, store) = sample_store();
        let store = Arc::new(store);

        // show002 has 3 seats left; both threads want 2.
        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || store.book("show002", 2)));
        }
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one booking must win the race");
        let res = store.showtimes_for("Inception", Some("Delhi")).unwrap();
        assert_eq!(res.showtimes[1].seats.available, 1);
    }

    #[test]
    fn available_never_exceeds_total_under_contention() {
        let (_dir, store) = sample_store();
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                let _ = store.book("show001", 7);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let res = store.showtimes_for("Inception", Some("Delhi")).unwrap();
        let seats = res.showtimes[0].seats;
        assert!(seats.available <= seats.total);
        // 42 available, 8 x 7 requested: six bookings fit.
        assert_eq!(seats.available, 0);
    }
}
