//! Archive of the best individuals seen during a run.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use super::individual::Individual;

/// Keeps the `capacity` lowest-error individuals seen so far.
#[derive(Debug, Default)]
pub struct BestIndividualArchive {
    /// Stored entries, lowest error first.
    entries: Vec<ArchivedIndividual>,
    /// Output directory for JSON snapshots.
    output_dir: Option<PathBuf>,
    capacity: usize,
}

/// An archived individual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedIndividual {
    pub id: u64,
    /// Model error, the negated fitness.
    pub error: f64,
    pub parameters: Vec<f64>,
    /// Generation in which the individual entered the archive.
    pub generation: usize,
    /// File path if saved.
    #[serde(skip)]
    pub saved_path: Option<PathBuf>,
}

impl ArchivedIndividual {
    fn from_individual(individual: &Individual, generation: usize) -> Self {
        Self {
            id: individual.id(),
            error: -individual.fitness(),
            parameters: individual.object_values(),
            generation,
            saved_path: None,
        }
    }
}

impl BestIndividualArchive {
    /// Create a new archive.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            output_dir: None,
            capacity,
        }
    }

    /// Export every entry that enters the archive to `dir`.
    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> io::Result<Self> {
        let path = dir.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        self.output_dir = Some(path);
        Ok(self)
    }

    /// Merge a population sorted by descending fitness into the archive.
    ///
    /// Individuals already stored (same id) are not added again. A new
    /// individual displaces a stored one only when its error is strictly
    /// lower. Returns the number of new entries.
    pub fn merge(&mut self, population: &[Individual], generation: usize) -> io::Result<usize> {
        let stored: HashSet<u64> = self.entries.iter().map(|e| e.id).collect();
        let mut candidates = population
            .iter()
            .filter(|individual| !stored.contains(&individual.id()))
            .peekable();
        let mut old = std::mem::take(&mut self.entries).into_iter().peekable();

        let mut merged = Vec::with_capacity(self.capacity);
        let mut added = Vec::new();

        while merged.len() < self.capacity {
            let take_new = match (candidates.peek(), old.peek()) {
                (Some(individual), Some(entry)) => -individual.fitness() < entry.error,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            if take_new {
                if let Some(individual) = candidates.next() {
                    added.push(merged.len());
                    merged.push(ArchivedIndividual::from_individual(individual, generation));
                }
            } else if let Some(entry) = old.next() {
                merged.push(entry);
            }
        }

        let evicted: Vec<ArchivedIndividual> = old.collect();
        self.entries = merged;

        if self.output_dir.is_some() {
            for &index in &added {
                self.save_entry(index)?;
            }
            for entry in &evicted {
                if let Some(path) = &entry.saved_path {
                    fs::remove_file(path)?;
                }
            }
        }

        if !added.is_empty() {
            debug!(
                "Archive: {} new, {} evicted, best error {:.6}",
                added.len(),
                evicted.len(),
                self.entries.first().map_or(f64::NAN, |e| e.error)
            );
        }

        Ok(added.len())
    }

    /// Write one entry as JSON.
    fn save_entry(&mut self, index: usize) -> io::Result<PathBuf> {
        let output_dir = self
            .output_dir
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No output directory set"))?;

        let entry = self
            .entries
            .get_mut(index)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Entry not found"))?;

        let filename = format!("best_{}_gen{}.json", entry.id, entry.generation);
        let path = output_dir.join(&filename);

        let json = serde_json::to_string_pretty(&*entry)?;
        fs::write(&path, json)?;

        entry.saved_path = Some(path.clone());
        Ok(path)
    }

    /// Stored entries, lowest error first.
    pub fn entries(&self) -> &[ArchivedIndividual] {
        &self.entries
    }

    pub fn best(&self) -> Option<&ArchivedIndividual> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load an exported entry from file.
pub fn load_archived_individual<P: AsRef<Path>>(path: P) -> io::Result<ArchivedIndividual> {
    let content = fs::read_to_string(&path)?;
    let mut entry: ArchivedIndividual = serde_json::from_str(&content)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    entry.saved_path = Some(path.as_ref().to_path_buf());
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn individual(x: f64, fitness: f64) -> Individual {
        Individual::new(vec![x.into()], vec![1.0.into()], fitness)
    }

    fn errors(archive: &BestIndividualArchive) -> Vec<f64> {
        archive.entries().iter().map(|e| e.error).collect()
    }

    #[test]
    fn test_keeps_lowest_errors() {
        let mut archive = BestIndividualArchive::new(3);
        let first = vec![individual(0.0, -2.0), individual(1.0, -5.0)];
        assert_eq!(archive.merge(&first, 0).unwrap(), 2);
        assert_eq!(errors(&archive), vec![2.0, 5.0]);

        let second = vec![individual(2.0, -1.0), individual(3.0, -3.0), individual(4.0, -9.0)];
        assert_eq!(archive.merge(&second, 1).unwrap(), 2);
        assert_eq!(errors(&archive), vec![1.0, 2.0, 3.0]);
        assert_eq!(archive.best().unwrap().parameters, vec![2.0]);
        assert_eq!(archive.best().unwrap().generation, 1);
    }

    #[test]
    fn test_surviving_individual_is_not_duplicated() {
        let mut archive = BestIndividualArchive::new(2);
        let population = vec![individual(0.0, -1.0), individual(1.0, -2.0)];
        archive.merge(&population, 0).unwrap();

        assert_eq!(archive.merge(&population, 1).unwrap(), 0);
        let ids: Vec<u64> = archive.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![population[0].id(), population[1].id()]);
    }

    #[test]
    fn test_equal_error_keeps_stored_entry() {
        let mut archive = BestIndividualArchive::new(1);
        let stored = individual(0.0, -1.0);
        archive.merge(std::slice::from_ref(&stored), 0).unwrap();

        assert_eq!(archive.merge(&[individual(5.0, -1.0)], 1).unwrap(), 0);
        assert_eq!(archive.best().unwrap().id, stored.id());
    }

    #[test]
    fn test_export_and_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = BestIndividualArchive::new(1)
            .with_output_dir(dir.path().join("best"))
            .unwrap();

        archive.merge(&[individual(0.5, -4.0)], 0).unwrap();
        let first_path = archive.best().unwrap().saved_path.clone().unwrap();
        assert!(first_path.exists());

        archive.merge(&[individual(0.25, -0.5)], 1).unwrap();
        let second_path = archive.best().unwrap().saved_path.clone().unwrap();
        assert!(!first_path.exists());
        assert!(second_path.exists());

        let loaded = load_archived_individual(&second_path).unwrap();
        assert_eq!(loaded.error, 0.5);
        assert_eq!(loaded.parameters, vec![0.25]);
        assert_eq!(loaded.generation, 1);
    }
}
