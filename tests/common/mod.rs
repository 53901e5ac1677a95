#![allow(dead_code)]

use jobcheck::TrainingRecord;

pub const REAL_WORDS: [&str; 24] = [
    "engineer", "developer", "analyst", "manager", "office", "team", "project", "salary",
    "benefit", "insurance", "dental", "pension", "career", "growth", "experience", "degree",
    "software", "design", "product", "customer", "meeting", "quarterly", "review", "mentor",
];

pub const FAKE_WORDS: [&str; 24] = [
    "earn", "cash", "fast", "wire", "transfer", "fee", "urgent", "home",
    "easy", "money", "guaranteed", "bonus", "click", "whatsapp", "payment", "upfront",
    "instant", "weekly", "investment", "profit", "crypto", "gift", "card", "deposit",
];

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Twelve words from `words`, starting at a seed-dependent offset.
fn posting(words: &[&str], seed: usize) -> String {
    (0..12)
        .map(|k| words[(seed * 5 + k * 7) % words.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn real_posting(seed: usize) -> String {
    format!("Job #{}: {}!", seed, posting(&REAL_WORDS, seed))
}

pub fn fake_posting(seed: usize) -> String {
    format!("URGENT!!! {} -- apply at http://scam.example/{}", posting(&FAKE_WORDS, seed), seed)
}

pub fn records(real: usize, fake: usize) -> Vec<TrainingRecord> {
    let mut records: Vec<TrainingRecord> = (0..real).map(|i| TrainingRecord::new(real_posting(i), 0)).collect();
    records.extend((0..fake).map(|i| TrainingRecord::new(fake_posting(i), 1)));
    records
}

pub fn dataset_csv(records: &[TrainingRecord]) -> String {
    let mut csv = String::from("job_id,title,company_profile,description,requirements,benefits,fraudulent\n");
    for (i, record) in records.iter().enumerate() {
        csv.push_str(&format!("{},,,\"{}\",,,{}\n", i, record.text.replace('"', "\"\""), record.label));
    }
    csv
}
