//! `<PROFILE>_Params.c`

use crate::checksum::ChecksumIndex;
use crate::profile::{DeviceProfile, Parameter, VarType};

use super::{c_callback, c_escape, c_number, c_string, join_sections, EmitOptions, BANNER};

/// Selector caption column width in the item arrays
const CAPTION_WIDTH: usize = 42;

/// Alias characters kept in the metadata array
const ALIAS_CHARS: usize = 8;

pub(super) fn render(profile: &DeviceProfile, index: &ChecksumIndex, options: &EmitOptions) -> String {
    let mut sections = vec![
        vec![
            BANNER.to_string(),
            format!("#include \"{}\"", options.include),
            format!("#include \"{}\"", profile.header_file_name()),
        ],
        vec![
            format!("#define {} {}", profile.size_macro(), profile.parameters.len()),
            format!("#define SELECTORS_NUM {}", profile.used_selectors().len()),
        ],
        vec![format!("{} {};", profile.type_name(), profile.struct_name)],
        parmenu(profile),
    ];
    sections.extend(hash_lookup(profile, index));
    sections.extend(index_to_hash(profile, index));
    sections.push(metadata_array(profile));
    sections.extend(selector_tables(profile));
    sections.push(instance_descriptor(profile));
    join_sections(sections)
}

fn parmenu(profile: &DeviceProfile) -> Vec<String> {
    let entries: Vec<_> = profile.menu_entries().collect();

    let mut lines = vec![
        format!("static const T_parmenu parmenu[{}] =", entries.len()),
        "{".to_string(),
    ];
    for category in entries {
        let parent = category.parent.as_deref().unwrap_or_default();
        let note = if category.description.is_empty() {
            &category.comment
        } else {
            &category.description
        };
        lines.push(format!(
            "  {{ {:<28}, {:<28}, \"{:<40}\", \"{:<20}\", {:3} }}, // {}",
            parent,
            category.name,
            c_escape(&category.description),
            c_escape(&category.comment),
            u8::from(category.visible),
            note
        ));
    }
    lines.push("};".to_string());
    lines
}

fn hash_lookup(profile: &DeviceProfile, index: &ChecksumIndex) -> Vec<Vec<String>> {
    let size = profile.size_macro();
    let mut table = vec![
        "// Parameter hash table for fast parameter lookup by CRC16 hash".to_string(),
        "// Table is sorted by hash values for binary search".to_string(),
        "typedef struct".to_string(),
        "{".to_string(),
        "  uint16_t hash;     // CRC16 hash of parameter name".to_string(),
        "  uint16_t index;    // Index in parameter array".to_string(),
        "} T_param_hash_entry;".to_string(),
        String::new(),
        format!("static const T_param_hash_entry param_hash_table[{}] =", size),
        "{".to_string(),
    ];
    let entries = index.entries();
    for (i, entry) in entries.iter().enumerate() {
        let comma = if i + 1 == entries.len() { "" } else { "," };
        let name = profile
            .parameters
            .get(usize::from(entry.index))
            .map_or("", |p| p.variable_name.as_str());
        table.push(format!(
            "  {{0x{:04X}, {:2}}}{}  // {}",
            entry.checksum, entry.index, comma, name
        ));
    }
    table.push("};".to_string());

    let function = vec![
        "// Binary search function to find parameter index by CRC16 hash".to_string(),
        "// Returns parameter index or 0xFFFF if not found".to_string(),
        "uint16_t Find_param_by_hash(uint16_t hash)".to_string(),
        "{".to_string(),
        "  int left = 0;".to_string(),
        format!("  int right = {} - 1;", size),
        String::new(),
        "  while (left <= right)".to_string(),
        "  {".to_string(),
        "    int mid = (left + right) / 2;".to_string(),
        "    if (param_hash_table[mid].hash == hash)".to_string(),
        "    {".to_string(),
        "      return param_hash_table[mid].index;".to_string(),
        "    }".to_string(),
        "    if (param_hash_table[mid].hash < hash)".to_string(),
        "    {".to_string(),
        "      left = mid + 1;".to_string(),
        "    }".to_string(),
        "    else".to_string(),
        "    {".to_string(),
        "      right = mid - 1;".to_string(),
        "    }".to_string(),
        "  }".to_string(),
        "  return 0xFFFF; // Parameter not found".to_string(),
        "}".to_string(),
    ];
    vec![table, function]
}

fn index_to_hash(profile: &DeviceProfile, index: &ChecksumIndex) -> Vec<Vec<String>> {
    let size = profile.size_macro();
    let mut table = vec![
        "// Parameter index-to-hash table for CAN command transmission".to_string(),
        "// Array index corresponds to parameter index, value is CRC16 hash".to_string(),
        format!("static const uint16_t param_index_to_hash_table[{}] =", size),
        "{".to_string(),
    ];
    let checksums = index.checksums();
    for (position, (checksum, parameter)) in checksums.iter().zip(&profile.parameters).enumerate() {
        let comma = if position + 1 == checksums.len() { "" } else { "," };
        table.push(format!(
            "  0x{:04X}{}  // [{:2}] {}",
            checksum, comma, position, parameter.variable_name
        ));
    }
    table.push("};".to_string());

    let function = vec![
        "// Function to get parameter hash by index for CAN transmission".to_string(),
        "// Returns parameter hash or 0x0000 if index is out of range".to_string(),
        "uint16_t Get_param_hash_by_index(uint16_t index)".to_string(),
        "{".to_string(),
        format!("  if (index >= {})", size),
        "  {".to_string(),
        "    return 0x0000; // Invalid index".to_string(),
        "  }".to_string(),
        "  return param_index_to_hash_table[index];".to_string(),
        "}".to_string(),
    ];
    vec![table, function]
}

// ============================================================================
// Metadata array
// ============================================================================

const METADATA_COLUMNS: [&str; 16] = [
    "var_name",
    "var_description",
    "var_alias",
    "val",
    "vartype",
    "defval",
    "minval",
    "maxval",
    "attr",
    "parmnlev",
    "pdefval",
    "format",
    "func",
    "varlen",
    "menu_pos",
    "selector_id",
];

fn metadata_cells(profile: &DeviceProfile, position: usize, p: &Parameter) -> Vec<String> {
    let field = format!("{}.{}", profile.struct_name, p.variable_name);
    let alias: String = p.alias.chars().take(ALIAS_CHARS).collect();
    let size = if p.var_type == VarType::String {
        format!("sizeof({})-1", field)
    } else {
        format!("sizeof({})", field)
    };

    vec![
        format!("/* {:02} */ {}", position, c_string(&p.variable_name)),
        c_string(&p.description),
        c_string(&alias),
        format!("(void*)&{}", field),
        p.var_type.name().to_string(),
        c_number(&p.default_value),
        c_number(&p.min_value),
        c_number(&p.max_value),
        c_number(&p.attributes),
        p.category.clone(),
        c_string(&p.default_string),
        c_string(&p.format),
        c_callback(&p.callback),
        size,
        p.menu_pos.to_string(),
        profile.selector_id(p.selector.as_deref()).to_string(),
    ]
}

fn pad_cells<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn metadata_array(profile: &DeviceProfile) -> Vec<String> {
    let rows: Vec<Vec<String>> = profile
        .parameters
        .iter()
        .enumerate()
        .map(|(position, p)| metadata_cells(profile, position, p))
        .collect();

    let mut widths: Vec<usize> = METADATA_COLUMNS.iter().map(|c| c.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = vec![
        "// Array items are sorted by CategoryName followed by SubNumber".to_string(),
        format!(
            "static const T_NV_parameters {}[{}] =",
            profile.array_name(),
            profile.size_macro()
        ),
        "{".to_string(),
        format!("  // {}", pad_cells(&METADATA_COLUMNS, &widths))
            .trim_end()
            .to_string(),
    ];
    for (i, row) in rows.iter().enumerate() {
        let comma = if i + 1 == rows.len() { "" } else { "," };
        lines.push(format!("  {{ {} }}{}", pad_cells(row, &widths), comma));
    }
    lines.push("};".to_string());
    lines
}

// ============================================================================
// Selectors
// ============================================================================

fn selector_tables(profile: &DeviceProfile) -> Vec<Vec<String>> {
    let used = profile.used_selectors();
    let mut sections = Vec::new();

    for (i, selector) in used.iter().enumerate() {
        if selector.items.is_empty() {
            continue;
        }
        let mut lines = vec![
            format!("// Selector description:  {}", selector.description),
            format!(
                "static const T_selector_items selector_{}[{}] = ",
                i + 1,
                selector.items.len()
            ),
            "{".to_string(),
        ];
        for item in &selector.items {
            let caption = c_escape(&item.caption);
            let pad = CAPTION_WIDTH.saturating_sub(caption.chars().count());
            lines.push(format!(
                "  {{ {} , \"{}\"{}, {}}},",
                item.value,
                caption,
                " ".repeat(pad),
                item.image_index
            ));
        }
        lines.push("};".to_string());
        sections.push(lines);
    }

    let mut list = vec![
        format!("static const T_selectors_list selectors_list[{}] = ", used.len()),
        "{".to_string(),
    ];
    for (i, selector) in used.iter().enumerate() {
        let (array, len) = if selector.items.is_empty() {
            ("0".to_string(), 0)
        } else {
            (format!("selector_{}", i + 1), selector.items.len())
        };
        list.push(format!(
            "  {{\"{:<30}\", {:<4}, {:<12}}},",
            c_escape(&selector.name),
            len,
            array
        ));
    }
    list.push("};".to_string());
    sections.push(list);
    sections
}

fn instance_descriptor(profile: &DeviceProfile) -> Vec<String> {
    vec![
        format!("const T_NV_parameters_instance {} =", profile.instance_name()),
        "{".to_string(),
        format!("  {},", profile.size_macro()),
        format!("  {},", profile.array_name()),
        format!("  {},", profile.menu_entries().count()),
        "  parmenu,".to_string(),
        "  SELECTORS_NUM,".to_string(),
        "  selectors_list".to_string(),
        "};".to_string(),
    ]
}
