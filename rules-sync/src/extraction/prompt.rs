//! Prompt builders for rule extraction.
//!
//! Keep prompts compact; the JSON contract and the severity/scope inference
//! guidance live in the system message, file contents in the user message.

use llm_runner::PromptMessage;

/// Shared JSON contract appended to every system prompt.
fn push_json_contract(s: &mut String) {
    s.push_str("\n# Output contract\n");
    s.push_str("Respond with ONLY a JSON array of rule objects, no prose, no code fences.\n");
    s.push_str("Each object: {\"title\", \"rule\", \"severity\", \"scope\", \"examples\"}.\n");
    s.push_str("- \"severity\": one of \"low\", \"medium\", \"high\", \"critical\".\n");
    s.push_str("  Infer from modal language: must/required/never/security -> high or critical; ");
    s.push_str("should/prefer -> medium; tip/optional/consider -> low.\n");
    s.push_str("- \"scope\": \"file\" for code-level rules, \"pull-request\" for rules about ");
    s.push_str("PR titles, descriptions or templates.\n");
    s.push_str("- \"examples\": list of {\"snippet\", \"isCorrect\"}; omit when none exist.\n");
    s.push_str("- Always write titles and rule text in English, whatever the source language.\n");
}

/// Primary prompt for one rule file: emit exactly one merged rule.
pub fn build_file_rule_prompt(path: &str, content: &str) -> Vec<PromptMessage> {
    let mut sys = String::new();
    sys.push_str("You are a code-review rule extractor. The user provides one IDE rule file ");
    sys.push_str("(Cursor rules, Copilot instructions, contribution guide or similar).\n");
    sys.push_str("Merge everything the file prescribes into EXACTLY ONE rule object that a ");
    sys.push_str("reviewer could enforce on pull requests.\n");
    push_json_contract(&mut sys);

    let mut user = String::new();
    user.push_str(&format!("# File: {path}\n```\n"));
    user.push_str(content);
    user.push_str("\n```\n");

    vec![PromptMessage::system(sys), PromptMessage::user(user)]
}

/// Simplified instruction set for the raw fallback attempt on one file.
pub fn build_file_rule_prompt_fallback(path: &str, content: &str) -> Vec<PromptMessage> {
    let mut user = String::new();
    user.push_str("Extract one code-review rule from the file below. Reply with a JSON array ");
    user.push_str("containing a single object with \"title\" and \"rule\" fields ");
    user.push_str("(optionally \"severity\" and \"scope\"). English only.\n");
    user.push_str(&format!("\n# File: {path}\n```\n"));
    user.push_str(content);
    user.push_str("\n```\n");

    vec![PromptMessage::user(user)]
}

/// Batch prompt: several files in one call, capped at the top `max_rules`
/// rules ranked by impact.
pub fn build_batch_rule_prompt(
    files: &[(String, String)],
    max_rules: usize,
) -> Vec<PromptMessage> {
    let mut sys = String::new();
    sys.push_str("You are a code-review rule extractor. The user provides several rule files ");
    sys.push_str("from one repository.\n");
    sys.push_str(&format!(
        "Produce AT MOST {max_rules} rule objects: the rules with the highest impact on code \
         quality across all files, ranked most impactful first.\n"
    ));
    sys.push_str("Set each object's \"sourcePath\" to the file it was derived from.\n");
    push_json_contract(&mut sys);

    let mut user = String::new();
    for (path, content) in files {
        user.push_str(&format!("# File: {path}\n```\n"));
        user.push_str(content);
        user.push_str("\n```\n\n");
    }

    vec![PromptMessage::system(sys), PromptMessage::user(user)]
}

/// Manifest variant: dependency descriptors carry no rule text, so the model
/// infers stack-appropriate review rules instead of parsing literal syntax.
pub fn build_manifest_rule_prompt(
    files: &[(String, String)],
    max_rules: usize,
) -> Vec<PromptMessage> {
    let mut sys = String::new();
    sys.push_str("You are a code-review rule extractor. The user provides dependency manifest ");
    sys.push_str("files (package manifests, lockfiles). These contain NO explicit rules.\n");
    sys.push_str("Infer the technology stack and produce review rules appropriate for it: ");
    sys.push_str("security practices, secrets handling, logging discipline, testing ");
    sys.push_str("conventions for the frameworks you recognize.\n");
    sys.push_str(&format!(
        "Produce AT MOST {max_rules} rule objects, most impactful first, and set each \
         \"sourcePath\" to the manifest it was inferred from.\n"
    ));
    push_json_contract(&mut sys);

    let mut user = String::new();
    for (path, content) in files {
        user.push_str(&format!("# File: {path}\n```\n"));
        user.push_str(content);
        user.push_str("\n```\n\n");
    }

    vec![PromptMessage::system(sys), PromptMessage::user(user)]
}
