//! Countries offered during onboarding and their regions.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    pub name: &'static str,
    pub regions: &'static [&'static str],
}

pub const COUNTRIES: &[Country] = &[
    Country {
        name: "Saudi Arabia",
        regions: &["Riyadh", "Makkah", "Madinah", "Qassim", "Eastern Province", "Asir", "Tabuk", "Hail", "Jazan", "Najran"],
    },
    Country {
        name: "Egypt",
        regions: &["Cairo", "Giza", "Alexandria", "Dakahlia", "Sharqia", "Port Said", "Suez", "Luxor", "Aswan", "Red Sea"],
    },
    Country {
        name: "UAE",
        regions: &["Abu Dhabi", "Dubai", "Sharjah", "Ajman", "Umm Al Quwain", "Ras Al Khaimah", "Fujairah"],
    },
    Country {
        name: "Kuwait",
        regions: &["Capital", "Ahmadi", "Farwaniya", "Jahra", "Hawalli", "Mubarak Al-Kabeer"],
    },
    Country {
        name: "Qatar",
        regions: &["Doha", "Al Rayyan", "Al Wakrah", "Umm Salal", "Al Khor", "Al Shamal"],
    },
    Country {
        name: "Bahrain",
        regions: &["Capital", "Muharraq", "Northern", "Southern"],
    },
    Country {
        name: "Oman",
        regions: &["Muscat", "Dhofar", "Musandam", "Al Buraimi", "Ad Dakhiliyah", "Al Batinah"],
    },
    Country {
        name: "Jordan",
        regions: &["Amman", "Irbid", "Zarqa", "Mafraq", "Jerash", "Madaba", "Karak", "Aqaba"],
    },
    Country {
        name: "Iraq",
        regions: &["Baghdad", "Basra", "Nineveh", "Erbil", "Najaf", "Kirkuk", "Anbar", "Karbala"],
    },
    Country {
        name: "Morocco",
        regions: &["Casablanca", "Rabat", "Fes", "Marrakesh", "Agadir", "Tangier", "Meknes", "Oujda"],
    },
    Country {
        name: "Algeria",
        regions: &["Algiers", "Oran", "Constantine", "Annaba", "Blida", "Batna", "Setif"],
    },
    Country {
        name: "Tunisia",
        regions: &["Tunis", "Sfax", "Sousse", "Kairouan", "Bizerte", "Gabes", "Monastir"],
    },
    Country {
        name: "Lebanon",
        regions: &["Beirut", "Mount Lebanon", "North", "South", "Beqaa", "Nabatieh"],
    },
    Country {
        name: "Other",
        regions: &[],
    },
];

/// Exact, case-insensitive lookup.
pub fn find_country(name: &str) -> Option<&'static Country> {
    let name = name.trim();
    COUNTRIES.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

impl Country {
    pub fn has_regions(&self) -> bool {
        !self.regions.is_empty()
    }

    pub fn find_region(&self, name: &str) -> Option<&'static str> {
        let name = name.trim();
        self.regions.iter().copied().find(|r| r.eq_ignore_ascii_case(name))
    }
}
