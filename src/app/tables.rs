use phf::phf_map;

/// Branch display name -> 3-digit branch code
pub static BRANCH_CODES: phf::Map<&'static str, &'static str> = phf_map! {
    "Electronics Engineering (VLSI)" => "159",
    "Computer Science & Engineering (CSE)" => "105",
    "Electrical & Electronics Engineering (EEE)" => "110",
    "Civil Engineering" => "101",
    "Mining Engineering" => "113",
    "Mechanical Engineering" => "102",
};

pub static BRANCH_FULL_NAMES: phf::Map<&'static str, &'static str> = phf_map! {
    "159" => "Electronics Engineering (VLSI)",
    "105" => "Computer Science & Engineering (CSE)",
    "110" => "Electrical & Electronics Engineering (EEE)",
    "101" => "Civil Engineering",
    "113" => "Mining Engineering",
    "102" => "Mechanical Engineering",
};

pub static COLLEGE_NAMES: phf::Map<&'static str, &'static str> = phf_map! {
    "124" => "Sher Shah Engineering College",
};

/// Accepts either a branch display name or a known 3-digit code
pub fn resolve_branch_code(branch: &str) -> Option<&'static str> {
    let branch = branch.trim();
    if let Some(code) = BRANCH_CODES.get(branch) {
        return Some(code);
    }
    BRANCH_FULL_NAMES.get_key(branch).copied()
}

pub fn branch_name(code: &str) -> String {
    BRANCH_FULL_NAMES
        .get(code)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("Branch Code {}", code))
}

pub fn college_name(code: &str) -> String {
    COLLEGE_NAMES
        .get(code)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("College Code {}", code))
}
