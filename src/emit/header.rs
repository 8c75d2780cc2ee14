//! `<PROFILE>_Params.h`

use crate::profile::DeviceProfile;

use super::{join_sections, sanitize_caption, upper_snake, BANNER};

pub(super) fn render(profile: &DeviceProfile) -> String {
    let guard = profile.header_guard();

    let mut sections = vec![
        vec![format!("#ifndef {}", guard), format!("#define {}", guard)],
        vec![BANNER.to_string()],
        category_constants(profile),
        struct_definition(profile),
    ];
    sections.extend(selector_constants(profile));
    sections.push(vec![
        format!("extern {} {};", profile.type_name(), profile.struct_name),
        format!(
            "extern const T_NV_parameters_instance {};",
            profile.instance_name()
        ),
    ]);
    sections.push(vec![
        "// Function for fast parameter lookup by CRC16 hash".to_string(),
        "uint16_t Find_param_by_hash(uint16_t hash);".to_string(),
    ]);
    sections.push(vec![
        "// Function to get parameter hash by index for CAN transmission".to_string(),
        "uint16_t Get_param_hash_by_index(uint16_t index);".to_string(),
    ]);
    sections.push(vec![format!("#endif // {}", guard)]);
    join_sections(sections)
}

fn category_constants(profile: &DeviceProfile) -> Vec<String> {
    let width = profile
        .categories
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0);

    let mut lines = vec!["// Category constants".to_string()];
    for (ordinal, category) in profile.categories.iter().enumerate() {
        lines.push(format!("#define {:<width$} {}", category.name, ordinal));
    }
    lines
}

fn struct_definition(profile: &DeviceProfile) -> Vec<String> {
    let fields: Vec<(String, &str)> = profile
        .parameters
        .iter()
        .map(|p| {
            let decl = if p.length > 0 {
                format!("  {} {}[{}];", p.c_type, p.variable_name, p.length)
            } else {
                format!("  {} {};", p.c_type, p.variable_name)
            };
            (decl, p.description.as_str())
        })
        .collect();
    let width = fields
        .iter()
        .map(|(decl, _)| decl.chars().count())
        .max()
        .unwrap_or(0);

    let mut lines = vec!["typedef struct".to_string(), "{".to_string()];
    for (decl, comment) in &fields {
        // comments start two columns after the longest declaration
        lines.push(format!("{:<width$}  // {}", decl, comment, width = width));
    }
    lines.push(format!("}} {};", profile.type_name()));
    lines
}

/// One section per used selector, led by the section title
fn selector_constants(profile: &DeviceProfile) -> Vec<Vec<String>> {
    let title = "// Selector constants".to_string();
    let groups = profile.constant_groups();
    if groups.is_empty() {
        return vec![vec![title]];
    }

    let mut sections = Vec::with_capacity(groups.len());
    for (i, selector) in groups.into_iter().enumerate() {
        let prefix = upper_snake(&selector.name);
        let macros: Vec<(String, i64)> = selector
            .items
            .iter()
            .map(|item| (format!("{}_{}", prefix, sanitize_caption(&item.caption)), item.value))
            .collect();
        let width = macros
            .iter()
            .map(|(name, _)| name.chars().count())
            .max()
            .unwrap_or(0);

        let mut lines = Vec::with_capacity(macros.len() + 2);
        if i == 0 {
            lines.push(title.clone());
        }
        lines.push(format!("// {}", selector.name));
        for (name, value) in macros {
            lines.push(format!("#define {:<width$} {}", name, value));
        }
        sections.push(lines);
    }
    sections
}
