//! Persisted per-session sequence numbers. Stored as a tiny two-line text
//! file in the session's store directory so a restart resumes from the
//! last number sent/expected rather than renegotiating from 1.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct SeqNumStore {
    path: PathBuf,
    outbound: AtomicU64,
    inbound: AtomicU64,
}

impl SeqNumStore {
    pub fn open(store_directory: &Path, session_id: &str) -> anyhow::Result<Self> {
        fs::create_dir_all(store_directory)?;
        let path = store_directory.join(format!("{session_id}.seqnum"));
        let (out, inb) = match fs::read_to_string(&path) {
            Ok(contents) => parse(&contents),
            Err(_) => (1, 1),
        };
        Ok(Self {
            path,
            outbound: AtomicU64::new(out),
            inbound: AtomicU64::new(inb),
        })
    }

    pub fn next_outbound(&self) -> u64 {
        let n = self.outbound.fetch_add(1, Ordering::SeqCst);
        self.persist();
        n
    }

    pub fn expected_inbound(&self) -> u64 {
        self.inbound.load(Ordering::SeqCst)
    }

    pub fn advance_inbound(&self) {
        self.inbound.fetch_add(1, Ordering::SeqCst);
        self.persist();
    }

    pub fn reset(&self) {
        self.outbound.store(1, Ordering::SeqCst);
        self.inbound.store(1, Ordering::SeqCst);
        self.persist();
    }

    fn persist(&self) {
        let contents = format!(
            "out={}\nin={}\n",
            self.outbound.load(Ordering::SeqCst),
            self.inbound.load(Ordering::SeqCst)
        );
        if let Err(err) = fs::write(&self.path, contents) {
            tracing::error!(path = ?self.path, %err, "failed to persist session sequence numbers");
        }
    }
}

fn parse(contents: &str) -> (u64, u64) {
    let mut out = 1;
    let mut inb = 1;
    for line in contents.lines() {
        if let Some(v) = line.strip_prefix("out=") {
            out = v.trim().parse().unwrap_or(1);
        } else if let Some(v) = line.strip_prefix("in=") {
            inb = v.trim().parse().unwrap_or(1);
        }
    }
    (out, inb)
}
