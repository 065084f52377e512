use std::fs::Metadata;
use std::time::SystemTime;

use chrono::{DateTime as ChronoDateTime, Local, NaiveDateTime};

/// DOS-style attribute bits, the common vocabulary of both back-ends.
/// On Windows the real bits are taken from the file metadata; elsewhere
/// they are derived (leading-dot name is hidden, permissions drive
/// read-only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attributes(u32);

impl Attributes {
    pub const READ_ONLY: Attributes = Attributes(0x01);
    pub const HIDDEN: Attributes = Attributes(0x02);
    pub const SYSTEM: Attributes = Attributes(0x04);
    pub const DIRECTORY: Attributes = Attributes(0x10);
    pub const ARCHIVE: Attributes = Attributes(0x20);

    const KNOWN: u32 = 0x37;

    pub const fn empty() -> Attributes {
        Attributes(0)
    }

    /// Keeps only the bits this crate knows about.
    pub fn from_bits(bits: u32) -> Attributes {
        Attributes(bits & Self::KNOWN)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Attributes) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Attributes) {
        self.0 |= other.0;
    }

    /// Maps a criteria letter to its flag: R, H, S, A or D, any case.
    pub fn from_letter(value: &str) -> Option<Attributes> {
        let mut chars = value.chars();
        let letter = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        match letter.to_ascii_uppercase() {
            'R' => Some(Self::READ_ONLY),
            'H' => Some(Self::HIDDEN),
            'S' => Some(Self::SYSTEM),
            'A' => Some(Self::ARCHIVE),
            'D' => Some(Self::DIRECTORY),
            _ => None,
        }
    }
}

/// The uniform shape the selection engine evaluates. Both the filesystem
/// walker and the archive reader produce one per candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Slash-separated display name; may carry a relative path prefix.
    pub name: String,
    pub size: u64,
    pub modified: NaiveDateTime,
    pub created: NaiveDateTime,
    pub accessed: NaiveDateTime,
    pub attributes: Attributes,
}

impl Entity {
    /// Builds the entity for one on-disk entry. `name` is what the name
    /// criterion sees; timestamps missing on the platform fall back to
    /// the modification time.
    pub fn from_fs(name: &str, meta: &Metadata) -> Entity {
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created = meta.created().unwrap_or(modified);
        let accessed = meta.accessed().unwrap_or(modified);
        Entity {
            name: name.replace('\\', "/"),
            size: meta.len(),
            modified: local_naive(modified),
            created: local_naive(created),
            accessed: local_naive(accessed),
            attributes: fs_attributes(name, meta),
        }
    }
}

pub(crate) fn local_naive(time: SystemTime) -> NaiveDateTime {
    let dt: ChronoDateTime<Local> = time.into();
    dt.naive_local()
}

pub(crate) fn final_component(name: &str) -> &str {
    let trimmed = name.trim_end_matches('/');
    match trimmed.rfind(['/', '\\']) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

fn fs_attributes(name: &str, meta: &Metadata) -> Attributes {
    let mut attrs = platform_attributes(name, meta);
    if meta.is_dir() {
        attrs.insert(Attributes::DIRECTORY);
    }
    if meta.permissions().readonly() {
        attrs.insert(Attributes::READ_ONLY);
    }
    attrs
}

#[cfg(target_os = "windows")]
fn platform_attributes(_name: &str, meta: &Metadata) -> Attributes {
    use std::os::windows::fs::MetadataExt;
    Attributes::from_bits(meta.file_attributes())
}

#[cfg(not(target_os = "windows"))]
fn platform_attributes(name: &str, _meta: &Metadata) -> Attributes {
    if final_component(name).starts_with('.') {
        Attributes::HIDDEN
    } else {
        Attributes::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{final_component, Attributes, Entity};
    use std::env;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn uniq_dir(label: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = env::temp_dir().join(format!("zipsift-entity-test-{label}-{ts}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn attribute_letters_map_to_flags() {
        assert_eq!(Attributes::from_letter("H"), Some(Attributes::HIDDEN));
        assert_eq!(Attributes::from_letter("r"), Some(Attributes::READ_ONLY));
        assert_eq!(Attributes::from_letter("d"), Some(Attributes::DIRECTORY));
        assert_eq!(Attributes::from_letter("X"), None);
        assert_eq!(Attributes::from_letter("RH"), None);
        assert_eq!(Attributes::from_letter(""), None);
    }

    #[test]
    fn contains_checks_all_requested_bits() {
        let mut attrs = Attributes::empty();
        attrs.insert(Attributes::HIDDEN);
        attrs.insert(Attributes::READ_ONLY);
        assert!(attrs.contains(Attributes::HIDDEN));
        assert!(!attrs.contains(Attributes::SYSTEM));
        assert!(!Attributes::empty().contains(Attributes::HIDDEN));
    }

    #[test]
    fn final_component_strips_directories() {
        assert_eq!(final_component("dirA/readme.txt"), "readme.txt");
        assert_eq!(final_component("readme.txt"), "readme.txt");
        assert_eq!(final_component("dirA/sub/"), "sub");
        assert_eq!(final_component("dirA\\sub\\x.bin"), "x.bin");
    }

    #[test]
    fn fs_entity_reflects_metadata() {
        let dir = uniq_dir("meta");
        let path = dir.join("sample.txt");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"hello world").unwrap();
        drop(f);

        let meta = fs::metadata(&path).unwrap();
        let entity = Entity::from_fs("sample.txt", &meta);
        assert_eq!(entity.size, 11);
        assert!(!entity.attributes.contains(Attributes::DIRECTORY));
        assert!(!entity.attributes.contains(Attributes::HIDDEN));

        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn dot_files_are_hidden_on_unix() {
        let dir = uniq_dir("hidden");
        let path = dir.join(".secret");
        File::create(&path).unwrap();

        let meta = fs::metadata(&path).unwrap();
        let entity = Entity::from_fs(".secret", &meta);
        assert!(entity.attributes.contains(Attributes::HIDDEN));

        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn readonly_permissions_set_the_flag() {
        let dir = uniq_dir("readonly");
        let path = dir.join("locked.txt");
        File::create(&path).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        let meta = fs::metadata(&path).unwrap();
        let entity = Entity::from_fs("locked.txt", &meta);
        assert!(entity.attributes.contains(Attributes::READ_ONLY));

        let _ = fs::remove_dir_all(&dir);
    }
}
