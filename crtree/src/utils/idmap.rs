/*!
Mapping between chromosome names and the integer ids stored in an index.

Ids are handed out in order of first appearance. The index file itself only
stores ids, so the map is saved separately as `name\tid` lines.
*/
use std::collections::HashMap;
use std::io::{self, BufRead, Write};

#[derive(Clone, Debug, Default)]
pub struct ChromIdMap {
    map: HashMap<String, u32>,
    names: Vec<String>,
}

impl ChromIdMap {
    /// If the key already exists in the map, this will simply return the id for it.
    /// Otherwise, the next unused id is assigned.
    pub fn get_id(&mut self, key: &str) -> u32 {
        if let Some(id) = self.map.get(key) {
            return *id;
        }
        let next_id = self.names.len() as u32;
        self.map.insert(key.to_string(), next_id);
        self.names.push(key.to_string());
        next_id
    }

    pub fn get(&self, key: &str) -> Option<u32> {
        self.map.get(key).copied()
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(|n| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names and ids, ordered by id
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.as_str(), id as u32))
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        for (name, id) in self.iter() {
            writeln!(out, "{}\t{}", name, id)?;
        }
        Ok(())
    }

    /// Reads a map written by [`write_to`][Self::write_to]. Ids must be
    /// contiguous and in order.
    pub fn read_from<R: BufRead>(read: R) -> io::Result<Self> {
        let mut map = ChromIdMap::default();
        for line in read.lines() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let (name, id) = line.rsplit_once('\t').ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid chrom line: {:}", line),
                )
            })?;
            let id = id.parse::<u32>().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, format!("Invalid id: {:}", id))
            })?;
            if id != map.get_id(name) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Unexpected id {} for chrom {}", id, name),
                ));
            }
        }
        Ok(map)
    }
}
