use rust_decimal::Decimal;
use serde::Serialize;

/// One line of the institutional price list shown on the request form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub device: &'static str,
    pub brand: &'static str,
    pub size: &'static str,
    pub price: u32,
    pub usage: &'static str,
    pub remarks: &'static str,
}

impl CatalogEntry {
    pub fn price_decimal(&self) -> Decimal {
        Decimal::from(self.price)
    }
}

/// The fixed equipment catalog. Maintained by hand; prices are in rupees.
pub const ENTRIES: &[CatalogEntry] = &[
    CatalogEntry { device: "SSD", brand: "Any", size: "256GB", price: 1750, usage: "win-10", remarks: "best and less price" },
    CatalogEntry { device: "RAM", brand: "Any", size: "8GB ddr3", price: 1600, usage: "win-10", remarks: "best and less price" },
    CatalogEntry { device: "Motherboard", brand: "Any", size: "G41-LGA 775 Socket", price: 1800, usage: "win-7", remarks: "best and less price" },
    CatalogEntry { device: "Motherboard", brand: "Any", size: "H61-LGA 1155 Socket", price: 2100, usage: "win-10", remarks: "best and less price" },
    CatalogEntry { device: "Motherboard", brand: "Any", size: "H110-LGA 1151 Socket", price: 2100, usage: "win-11", remarks: "best and less price" },
    CatalogEntry { device: "Processor", brand: "i3 3rd gen", size: "any", price: 1200, usage: "win-10", remarks: "best and less price" },
    CatalogEntry { device: "Processor", brand: "Intel dual core", size: "any", price: 1000, usage: "win-10", remarks: "best and less price" },
    CatalogEntry { device: "SMPS", brand: "Any", size: "any", price: 650, usage: "win-10", remarks: "best and less price" },
    CatalogEntry { device: "Keyboard", brand: "Any", size: "any", price: 700, usage: "win-10", remarks: "best and less price" },
    CatalogEntry { device: "Mouse", brand: "Any", size: "any", price: 400, usage: "win-10", remarks: "best and less price" },
    CatalogEntry { device: "Keyboard-Mouse combo", brand: "Any", size: "any", price: 1000, usage: "win-10", remarks: "best and less price" },
    CatalogEntry { device: "USB to PS2 Connector", brand: "Any", size: "any", price: 650, usage: "win-10", remarks: "best and less price" },
    CatalogEntry { device: "USB to LAN Connector", brand: "Any", size: "any", price: 650, usage: "win-10", remarks: "best and less price" },
    CatalogEntry { device: "Monitor", brand: "Any", size: "any", price: 5600, usage: "win-11", remarks: "best and less price" },
    CatalogEntry { device: "One Set (i3)", brand: "G61 + H61", size: "SSD 256GB + RAM 8GB", price: 7200, usage: "-", remarks: "Souza's Price 7200" },
    CatalogEntry { device: "One Set (i5)", brand: "Gh110", size: "SSD 256GB + RAM 8GB ddr4", price: 8800, usage: "-", remarks: "Souza's Price 8800" },
    CatalogEntry { device: "One Set (Dual core)", brand: "G41", size: "SSD 256GB + RAM 8GB", price: 6500, usage: "-", remarks: "Souza's Price" },
];

pub fn entries() -> &'static [CatalogEntry] {
    ENTRIES
}

/// Devices repeat (three motherboard variants), so lookup keys on
/// device + size.
pub fn find(device: &str, size: &str) -> Option<&'static CatalogEntry> {
    ENTRIES.iter().find(|entry| entry.device == device && entry.size == size)
}
