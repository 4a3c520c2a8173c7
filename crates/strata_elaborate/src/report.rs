//! Markdown module-info report of elaborated instances.

use strata_ir::{Design, FlatIdent, Identifier, ModuleInstance};

/// A markdown table with columns padded to their widest cell.
struct Table {
    header: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(header: Vec<&'static str>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }
        let line = |cells: Vec<&str>| -> String {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect();
            format!("| {} |\n", padded.join(" | "))
        };
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        let mut out = line(self.header.clone());
        out.push_str(&line(rule.iter().map(String::as_str).collect()));
        for row in &self.rows {
            out.push_str(&line(row.iter().map(String::as_str).collect()));
        }
        out
    }
}

fn section(out: &mut String, title: &str, table: &Table) {
    if table.rows.is_empty() {
        return;
    }
    out.push_str(&format!("\n### {title}\n\n"));
    out.push_str(&table.render());
}

fn guarded_name(ident: &Identifier, node: &FlatIdent) -> String {
    let name = format!("{}{}", "  ".repeat(node.level), node.name);
    if node.level > 0 || ident.ifdefs.is_empty() {
        return name;
    }
    let guards: Vec<&str> = ident.ifdefs.iter().map(|i| i.as_str()).collect();
    format!("{name} (ifdef {})", guards.join(", "))
}

/// Renders the report of one instance.
///
/// Struct ports and signals list their flattened members below them,
/// indented by two spaces per level. Declarations guarded by defines are
/// annotated with the define names.
pub fn module_info(inst: &ModuleInstance) -> String {
    let mut out = format!("## {} ({})\n", inst.modref(), inst.path);

    let mut defines = Table::new(vec!["Name", "Type", "Value"]);
    for define in inst.decl.defines.values() {
        defines.push(vec![
            define.name.to_string(),
            define.ty.to_string(),
            define.expr().to_string(),
        ]);
    }
    section(&mut out, "Defines", &defines);

    let mut params = Table::new(vec!["Name", "Type", "Value"]);
    for param in inst.namespace.params() {
        let value = inst
            .param(param.name)
            .map(|v| v.to_string())
            .unwrap_or_default();
        params.push(vec![param.name.to_string(), param.ty.to_string(), value]);
    }
    section(&mut out, "Parameters", &params);

    let mut ports = Table::new(vec!["Name", "Type", "Direction"]);
    for port in inst.namespace.ports() {
        for node in port.iter_tree() {
            let direction = node.direction().map(|d| d.to_string()).unwrap_or_default();
            ports.push(vec![
                guarded_name(port, &node),
                node.full_type().to_string(),
                direction,
            ]);
        }
    }
    section(&mut out, "Ports", &ports);

    let mut signals = Table::new(vec!["Name", "Type"]);
    for signal in inst.namespace.signals() {
        for node in signal.iter_tree() {
            signals.push(vec![
                guarded_name(signal, &node),
                node.full_type().to_string(),
            ]);
        }
    }
    section(&mut out, "Signals", &signals);

    let mut submodules = Table::new(vec!["Name", "Module"]);
    for child in &inst.children {
        submodules.push(vec![child.name.to_string(), child.modref().to_string()]);
    }
    section(&mut out, "Submodules", &submodules);

    let mut muxes = Table::new(vec!["Mux", "Condition", "Target", "Source"]);
    for conn in &inst.connections {
        let Some(guard) = &conn.guard else {
            continue;
        };
        let condition = match &guard.select {
            Some((sel, value)) => format!("{sel} == {value}"),
            None => "default".to_string(),
        };
        muxes.push(vec![
            guard.mux.to_string(),
            condition,
            conn.target.to_string(),
            conn.source.to_string(),
        ]);
    }
    section(&mut out, "Muxes", &muxes);

    out
}

/// Renders the report of every unique module of `design`, parents first.
pub fn design_info(design: &Design) -> String {
    design
        .unique()
        .into_iter()
        .map(module_info)
        .collect::<Vec<_>>()
        .join("\n")
}
