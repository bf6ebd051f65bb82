// src/config/leagues.rs

use anyhow::{bail, Context, Result};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

const SAMPLE: &str = "# League configuration file\n\
                      # Format: League Name: ID\n\
                      Premier League: 17\n\
                      LaLiga: 8\n\
                      Serie A: 23\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct League {
    pub id: u32,
    pub name: String,
}

/// League id → display name, backed by a plain text file.
#[derive(Debug, Clone, Default)]
pub struct LeagueRegistry {
    path: Option<PathBuf>,
    leagues: BTreeMap<u32, String>,
}

impl LeagueRegistry {
    /// Load the registry, writing the sample file first if it is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(path, SAMPLE).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "created sample league file");
        }

        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut registry = Self::parse(&text);
        registry.path = Some(path.to_path_buf());
        info!(count = registry.leagues.len(), path = %path.display(), "leagues loaded");
        Ok(registry)
    }

    /// Accepts `Name: ID` and `ID Name` lines. Comments, blanks and junk are skipped.
    pub fn parse(text: &str) -> Self {
        let mut leagues = BTreeMap::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line) {
                Some((id, name)) => {
                    debug!(id, %name, "league");
                    leagues.insert(id, name);
                }
                None => warn!(line = lineno + 1, content = line, "skipping malformed league line"),
            }
        }
        Self {
            path: None,
            leagues,
        }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        Self {
            path: None,
            leagues: pairs.into_iter().map(|(id, n)| (id, n.into())).collect(),
        }
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.leagues.get(&id).map(String::as_str)
    }

    /// Registered name, or `Unknown_League_{id}` for ids not in the file.
    pub fn name_or_default(&self, id: u32) -> String {
        self.get(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unknown_League_{id}"))
    }

    pub fn id_by_name(&self, name: &str) -> Option<u32> {
        self.leagues
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.leagues.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = League> + '_ {
        self.leagues.iter().map(|(id, name)| League {
            id: *id,
            name: name.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.leagues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leagues.is_empty()
    }

    pub fn add(&mut self, name: &str, id: u32) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("league name is empty");
        }
        if let Some(existing) = self.leagues.get(&id) {
            bail!("league {id} already registered as {existing}");
        }
        self.leagues.insert(id, name.to_string());
        self.save()
    }

    pub fn remove(&mut self, id: u32) -> Result<String> {
        let name = self
            .leagues
            .remove(&id)
            .with_context(|| format!("league {id} is not registered"))?;
        self.save()?;
        Ok(name)
    }

    /// Rewrite the backing file. A registry built in memory has nothing to save.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut out = String::from("# League configuration file\n# Format: League Name: ID\n");
        for (id, name) in &self.leagues {
            out.push_str(&format!("{name}: {id}\n"));
        }
        fs::write(path, out).with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), count = self.leagues.len(), "league file saved");
        Ok(())
    }
}

fn parse_line(line: &str) -> Option<(u32, String)> {
    if let Some((name, id)) = line.rsplit_once(':') {
        let name = name.trim();
        if let Ok(id) = id.trim().parse::<u32>() {
            if !name.is_empty() {
                return Some((id, name.to_string()));
            }
        }
    }
    let (id, name) = line.split_once(char::is_whitespace)?;
    let id = id.parse::<u32>().ok()?;
    let name = name.trim();
    (!name.is_empty()).then(|| (id, name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_both_formats() {
        let reg = LeagueRegistry::parse(
            "# comment\n\nPremier League: 17\n8 LaLiga\nbroken line\nSerie A: abc\n",
        );
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(17), Some("Premier League"));
        assert_eq!(reg.get(8), Some("LaLiga"));
        assert_eq!(reg.id_by_name("LaLiga"), Some(8));
        assert_eq!(reg.name_or_default(99), "Unknown_League_99");
    }

    #[test]
    fn test_load_creates_sample() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config").join("leagues.txt");
        let reg = LeagueRegistry::load(&path)?;
        assert!(path.exists());
        assert_eq!(reg.ids(), vec![8, 17, 23]);
        Ok(())
    }

    #[test]
    fn test_add_remove_persist() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("leagues.txt");
        fs::write(&path, "Premier League: 17\n")?;

        let mut reg = LeagueRegistry::load(&path)?;
        reg.add("Bundesliga", 35)?;
        assert!(reg.add("Dup", 17).is_err());

        let reloaded = LeagueRegistry::load(&path)?;
        assert_eq!(reloaded.get(35), Some("Bundesliga"));

        let mut reg = reloaded;
        assert_eq!(reg.remove(17)?, "Premier League");
        assert!(reg.remove(17).is_err());
        assert_eq!(LeagueRegistry::load(&path)?.ids(), vec![35]);
        Ok(())
    }
}
