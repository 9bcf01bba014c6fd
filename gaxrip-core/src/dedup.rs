//! Name disambiguation across a finished record set

use crate::types::RecordSet;
use hashbrown::HashMap;

/// Prefix every non-unique name with its record's address
///
/// Names shared by two or more records become `{address:08X}_{name}`; unique
/// names are left alone. A prefixed name can still clash with another
/// record's original name, so passes repeat until every name is unique.
/// Returns how many records were renamed.
pub fn dedup_names<P>(records: &mut RecordSet<P>) -> usize {
    let mut renamed = vec![false; records.len()];

    // Addresses are distinct, so each pass lengthens every clashing name
    for _ in 0..=records.len() {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in records.iter() {
            *counts.entry(record.name.clone()).or_default() += 1;
        }
        if counts.values().all(|&n| n == 1) {
            break;
        }

        for (i, record) in records.iter_mut().enumerate() {
            if counts.get(&record.name).copied().unwrap_or_default() > 1 {
                record.name = format!("{:08X}_{}", record.address, record.name);
                renamed[i] = true;
            }
        }
    }
    renamed.into_iter().filter(|&r| r).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Record, VersionInfo};
    use std::collections::BTreeMap;

    fn record(offset: usize, name: &str) -> Record<()> {
        Record {
            offset,
            address: 0x0800_0000 + offset as u32,
            version: VersionInfo::default(),
            name: name.to_string(),
            sub_pointers: BTreeMap::new(),
            payload: (),
        }
    }

    #[test]
    fn test_duplicates_get_address_prefix() {
        let mut set = RecordSet::new();
        set.insert(record(0x100, "Song")).unwrap();
        set.insert(record(0x200, "Song")).unwrap();
        set.insert(record(0x300, "Other")).unwrap();

        assert_eq!(dedup_names(&mut set), 2);

        let names: Vec<_> = set.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["08000100_Song", "08000200_Song", "Other"]);
    }

    #[test]
    fn test_unique_names_untouched() {
        let mut set = RecordSet::new();
        set.insert(record(0x10, "A")).unwrap();
        set.insert(record(0x20, "B")).unwrap();

        assert_eq!(dedup_names(&mut set), 0);
        assert_eq!(set.get(0x10).unwrap().name, "A");
    }

    #[test]
    fn test_renamed_names_are_unique() {
        let mut set = RecordSet::new();
        for i in 0..5 {
            set.insert(record(i * 0x40, "Dup")).unwrap();
        }
        dedup_names(&mut set);

        let mut names: Vec<_> = set.iter().map(|r| r.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_prefixed_name_clashing_with_original_is_renamed_again() {
        let mut set = RecordSet::new();
        set.insert(record(0x100, "\"S\" © A")).unwrap();
        set.insert(record(0x200, "\"S\" © A")).unwrap();
        set.insert(record(0x300, "08000100_\"S\" © A")).unwrap();

        assert_eq!(dedup_names(&mut set), 3);

        let names: Vec<_> = set.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "08000100_08000100_\"S\" © A",
                "08000200_\"S\" © A",
                "08000300_08000100_\"S\" © A",
            ]
        );
    }
}
