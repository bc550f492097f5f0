/// One Workload's claims, gathered for graph rendering.
pub struct GraphNode {
    pub namespace: String,
    pub name: String,
    pub endpoint: Option<String>,
    pub claims: Vec<serde_json::Value>,
}

pub fn render_applied(report: &serde_json::Value) -> String {
    let namespace = report["workload"]["meta"]["namespace"].as_str().unwrap_or("-");
    let name = report["workload"]["meta"]["name"].as_str().unwrap_or("-");
    let conditions = report["workload"]["status"]["conditions"].as_array().cloned().unwrap_or_default();
    let mut out = format!("Applied {namespace}/{name}\n");
    for c in &conditions {
        let type_ = c["type"].as_str().unwrap_or("-");
        let status = c["status"].as_str().unwrap_or("-");
        let reason = c["reason"].as_str().unwrap_or("-");
        out.push_str(&format!("  {type_}: {status} ({reason})\n"));
    }
    out
}

pub fn render_diff(report: &serde_json::Value) -> String {
    let conditions = report["workload"]["status"]["conditions"].as_array().cloned().unwrap_or_default();
    if conditions.is_empty() {
        return "No previewed status available.\n".to_string();
    }
    let mut out = String::from("Previewed status (not applied):\n");
    for c in &conditions {
        let type_ = c["type"].as_str().unwrap_or("-");
        let status = c["status"].as_str().unwrap_or("-");
        let reason = c["reason"].as_str().unwrap_or("-");
        out.push_str(&format!("  {type_}: {status} ({reason})\n"));
    }
    out
}

pub fn render_workload_status(workload: &serde_json::Value) -> String {
    let namespace = workload["meta"]["namespace"].as_str().unwrap_or("-");
    let name = workload["meta"]["name"].as_str().unwrap_or("-");
    let endpoint = workload["status"]["endpoint"].as_str().unwrap_or("-");
    let mut out = format!("{namespace}/{name}\n  endpoint: {endpoint}\n");
    for c in workload["status"]["conditions"].as_array().cloned().unwrap_or_default() {
        let type_ = c["type"].as_str().unwrap_or("-");
        let status = c["status"].as_str().unwrap_or("-");
        out.push_str(&format!("  {type_}: {status}\n"));
    }
    out
}

pub fn render_status_table(workloads: &[serde_json::Value]) -> String {
    if workloads.is_empty() {
        return "No workloads.".to_string();
    }
    let mut out = format!("{:<12} {:<20} {:<10} {}\n", "NAMESPACE", "NAME", "READY", "ENDPOINT");
    for wl in workloads {
        let namespace = wl["meta"]["namespace"].as_str().unwrap_or("-");
        let name = wl["meta"]["name"].as_str().unwrap_or("-");
        let endpoint = wl["status"]["endpoint"].as_str().unwrap_or("-");
        let ready = wl["status"]["conditions"]
            .as_array()
            .and_then(|conds| conds.iter().find(|c| c["type"].as_str() == Some("Ready")))
            .and_then(|c| c["status"].as_str())
            .unwrap_or("Unknown");
        out.push_str(&format!("{namespace:<12} {name:<20} {ready:<10} {endpoint}\n"));
    }
    out
}

pub fn render_graph_text(nodes: &[GraphNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        out.push_str(&format!("Workload: {}/{}\n", node.namespace, node.name));
        if let Some(endpoint) = &node.endpoint {
            out.push_str(&format!("  endpoint: {endpoint}\n"));
        }
        for claim in &node.claims {
            let key = claim["spec"]["key"].as_str().unwrap_or("-");
            let type_ = claim["spec"]["type"].as_str().unwrap_or("-");
            let phase = claim["status"]["phase"].as_str().unwrap_or("Pending");
            out.push_str(&format!("  claim: {key} ({type_}) — {phase}\n"));
        }
        out.push('\n');
    }
    out
}

pub fn render_dot(nodes: &[GraphNode]) -> String {
    let mut out = String::from("digraph scoreplane {\n  rankdir=LR;\n  node [shape=box];\n\n");
    for node in nodes {
        let wl_id = sanitize(&format!("{}_{}", node.namespace, node.name));
        out.push_str(&format!("  \"{wl_id}\" [label=\"{}/{}\"];\n", node.namespace, node.name));
        for claim in &node.claims {
            let key = claim["spec"]["key"].as_str().unwrap_or("-");
            let claim_id = sanitize(&format!("{wl_id}_{key}"));
            out.push_str(&format!("  \"{claim_id}\" [label=\"{key}\", shape=ellipse];\n"));
            out.push_str(&format!("  \"{wl_id}\" -> \"{claim_id}\";\n"));
        }
    }
    out.push('}');
    out
}

fn sanitize(s: &str) -> String {
    s.replace(['-', '.', '/'], "_")
}
