//! Code emission: renders a computed perfect hash into source code for a
//! target language by token substitution over a template.
//!
//! Tokens: `$NS` salt length, `$S1`/`$S2` formatted salts, `$NG` table
//! length, `$G` table contents, `$NK` key count, `$K` key list.

use crate::chm::MphError;
use crate::salt::{SaltHash, SaltKind};

/// Formatting options for the rendered artifact.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Separator between list items.
    pub delimiter: String,
    /// Maximal line width before a list wraps.
    pub width: usize,
    /// Spaces at the start of wrapped list lines.
    pub indent: usize,
    /// Custom template overriding the builtin one.
    pub template: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            delimiter: ", ".to_string(),
            width: 76,
            indent: 4,
            template: None,
        }
    }
}

/// Renders `(keys, G, f1, f2)` into target-language source text.
pub trait CodeGenerator {
    fn render(
        &self,
        keys: &[String],
        g: &[usize],
        f1: &dyn SaltHash,
        f2: &dyn SaltHash,
    ) -> String;
}

/// Generator for `language` (`"py"` or `"cs"`).
pub fn generator_for(
    language: &str,
    opts: RenderOptions,
) -> Result<Box<dyn CodeGenerator>, MphError> {
    match language {
        "py" => Ok(Box::new(PythonCodeGenerator { opts })),
        "cs" => Ok(Box::new(CSharpCodeGenerator { opts })),
        other => Err(MphError::UnknownLanguage(other.to_string())),
    }
}

pub struct PythonCodeGenerator {
    pub opts: RenderOptions,
}

impl CodeGenerator for PythonCodeGenerator {
    fn render(
        &self,
        keys: &[String],
        g: &[usize],
        f1: &dyn SaltHash,
        f2: &dyn SaltHash,
    ) -> String {
        let template = match &self.opts.template {
            Some(t) => t.clone(),
            None => python_builtin_template(f1.kind()),
        };
        substitute(&template, keys, g, f1, f2, &self.opts)
    }
}

fn python_builtin_template(kind: SaltKind) -> String {
    let hash = match kind {
        SaltKind::Str => {
            r#"
def hash_f(key, T):
    return sum(ord(T[i % $NS]) * ord(c) for i, c in enumerate(key)) % $NG

def perfect_hash(key):
    return (G[hash_f(key, "$S1")] +
            G[hash_f(key, "$S2")]) % $NG
"#
        }
        SaltKind::Int => {
            r#"
S1 = [$S1]
S2 = [$S2]
assert len(S1) == len(S2) == $NS

def hash_f(key, T):
    return sum(T[i % $NS] * ord(c) for i, c in enumerate(key)) % $NG

def perfect_hash(key):
    return (G[hash_f(key, S1)] + G[hash_f(key, S2)]) % $NG
"#
        }
    };

    format!(
        r#"
# =======================================================================
# ================= Python code for perfect hash function ===============
# =======================================================================

G = [$G]
{hash}
# ============================ Sanity check =============================

K = [$K]
assert len(K) == $NK

for h, k in enumerate(K):
    assert perfect_hash(k) == h
"#
    )
}

pub struct CSharpCodeGenerator {
    pub opts: RenderOptions,
}

impl CodeGenerator for CSharpCodeGenerator {
    fn render(
        &self,
        keys: &[String],
        g: &[usize],
        f1: &dyn SaltHash,
        f2: &dyn SaltHash,
    ) -> String {
        let template = match &self.opts.template {
            Some(t) => t.clone(),
            None => csharp_builtin_template(f1.kind()),
        };
        substitute(&template, keys, g, f1, f2, &self.opts)
    }
}

fn csharp_builtin_template(kind: SaltKind) -> String {
    let hash = match kind {
        SaltKind::Str => {
            r#"
    private int GetHash(string key, string salt)
    {
        int hash = 0;
        for (int i = 0; i < key.Length; i++)
            hash += salt[i] * key[i];
        hash %= $NG;
        return hash;
    }

    public int GetPerfectHash(string key)
    {
        int hash1 = GetHash(key, "$S1");
        int hash2 = GetHash(key, "$S2");
        int perfectHash = (vertexValues[hash1] + vertexValues[hash2]) % $NG;
        return perfectHash;
    }
"#
        }
        SaltKind::Int => {
            r#"
    private int[] S1 = { $S1 };
    private int[] S2 = { $S2 };

    private int GetHash(string key, int[] salt)
    {
        int hash = 0;
        for (int i = 0; i < key.Length; i++)
            hash += salt[i] * key[i];
        hash %= $NG;
        return hash;
    }

    public int GetPerfectHash(string key)
    {
        int hash1 = GetHash(key, S1);
        int hash2 = GetHash(key, S2);
        int perfectHash = (vertexValues[hash1] + vertexValues[hash2]) % $NG;
        return perfectHash;
    }
"#
        }
    };

    format!(
        r#"
// =======================================================================
// =================  C# code for perfect hash function    ===============
// =======================================================================

using System.Diagnostics;

public class PerfectHash
{{
    private int[] vertexValues =
    {{
$G
    }};
{hash}
// ============================ Sanity check =============================
    private string[] keys =
    {{
$K
    }};

    private void SanityCheck()
    {{
        Debug.Assert(keys.Length == $NK);

        for (int h = 0; h < keys.Length; h++)
        {{
            Debug.Assert(GetPerfectHash(keys[h]) == h);
        }}
    }}

    public static void Main()
    {{
        var hash = new PerfectHash();
        hash.SanityCheck();
    }}
}}
"#
    )
}

fn substitute(
    template: &str,
    keys: &[String],
    g: &[usize],
    f1: &dyn SaltHash,
    f2: &dyn SaltHash,
    opts: &RenderOptions,
) -> String {
    let g_pos = list_start(template, "$G");
    let k_pos = list_start(template, "$K");
    let g_items: Vec<String> = g.iter().map(|v| v.to_string()).collect();
    let key_items: Vec<String> = keys.iter().map(|k| quoted(k)).collect();
    template
        .replace("$NS", &f1.salt_len().to_string())
        .replace("$S1", &f1.formatted_salt())
        .replace("$S2", &f2.formatted_salt())
        .replace("$NG", &g.len().to_string())
        .replace("$G", &format_list(&g_items, opts, g_pos))
        .replace("$NK", &keys.len().to_string())
        .replace("$K", &format_list(&key_items, opts, k_pos))
}

/// Quote a key as a string literal, escaping backslashes and quotes so the
/// generated source stays syntactically valid.
fn quoted(key: &str) -> String {
    let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Column a list token starts at on its line of the template, so wrapping
/// honors the real layout. `None` (an indented line of its own) when the
/// token is absent or opens its line.
fn list_start(template: &str, token: &str) -> Option<usize> {
    let i = template.find(token)?;
    let line_begin = template[..i].rfind('\n').map_or(0, |p| p + 1);
    match i - line_begin {
        0 => None,
        col => Some(col),
    }
}

/// Join `items` with the configured delimiter, wrapping to fresh indented
/// lines whenever an item would push past the configured width. `start_pos`
/// is the column the list begins at; `None` starts on an indented line of
/// its own.
fn format_list(items: &[String], opts: &RenderOptions, start_pos: Option<usize>) -> String {
    let indent = " ".repeat(opts.indent);
    let mut out = String::new();
    let mut pos = match start_pos {
        Some(p) => p,
        None => {
            out.push_str(&indent);
            opts.indent
        }
    };

    for (i, item) in items.iter().enumerate() {
        let last = i == items.len() - 1;
        if pos + item.len() + opts.delimiter.len() > opts.width {
            out.push('\n');
            out.push_str(&indent);
            pos = opts.indent;
        }
        out.push_str(item);
        pos += item.len();
        if !last {
            out.push_str(&opts.delimiter);
            pos += opts.delimiter.len();
        }
    }

    out
}
