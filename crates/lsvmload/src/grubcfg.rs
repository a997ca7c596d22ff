//! The `grub.cfg` patch pass (spec.md §4.L5/§6): before a config is dropped
//! into the synthetic ESP shell, the lines that would load GRUB's own LUKS
//! stack are neutralized so GRUB never tries to re-unlock a volume this
//! loader has already interposed over. Grounded on
//! `original_source/lsvmutils/grubcfg.c`'s `GrubcfgPatch()`, restated over
//! `&[u8]` lines instead of that function's in-place `char*` scan.

/// Commands `GrubcfgPatch` blanks out, in the order it checks them.
const BLANKED_COMMANDS: [&[u8]; 4] =
    [b"insmod cryptodisk", b"insmod luks", b"insmod gcry_rijndael", b"insmod gcry_sha1"];

/// Comments out any of [`BLANKED_COMMANDS`] found at the start of a
/// (whitespace-trimmed) line, leaving every other line untouched. Matches
/// `grubcfg.c`'s behavior of overwriting only the matched prefix with `#`
/// rather than deleting or commenting the whole line, so trailing
/// whitespace and a line's original length survive the patch.
pub fn patch_grub_cfg(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for line in data.split_inclusive(|&b| b == b'\n') {
        out.extend_from_slice(&patch_line(line));
    }
    out
}

fn patch_line(line: &[u8]) -> Vec<u8> {
    let trimmed_start = line.iter().take_while(|b| b.is_ascii_whitespace()).count();
    let body = &line[trimmed_start..];
    if body.first() == Some(&b'#') {
        return line.to_vec();
    }

    let end = if body.ends_with(b"\r\n") {
        body.len() - 2
    } else if body.ends_with(b"\n") {
        body.len() - 1
    } else {
        body.len()
    };
    let content = &body[..end];

    for command in BLANKED_COMMANDS {
        if content.len() >= command.len() && &content[..command.len()] == command {
            let mut patched = line.to_vec();
            let start = trimmed_start;
            for b in patched.iter_mut().skip(start).take(command.len()) {
                *b = b'#';
            }
            return patched;
        }
    }

    line.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blanks_each_listed_insmod_line() {
        let cfg = b"insmod cryptodisk\ninsmod luks\ninsmod gcry_rijndael\ninsmod gcry_sha1\nset default=0\n";
        let patched = patch_grub_cfg(cfg);
        let text = core::str::from_utf8(&patched).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "##################");
        assert_eq!(lines[1], "###########");
        assert_eq!(lines[2], "#####################");
        assert_eq!(lines[3], "################");
        assert_eq!(lines[4], "set default=0");
    }

    #[test]
    fn leaves_unrelated_lines_untouched() {
        let cfg = b"menuentry 'Linux' {\n    linux /vmlinuz\n}\n";
        assert_eq!(patch_grub_cfg(cfg), cfg);
    }

    #[test]
    fn tolerates_indentation_before_the_command() {
        let cfg = b"    insmod luks\n";
        let patched = patch_grub_cfg(cfg);
        assert_eq!(&patched[..4], b"    ");
        assert_eq!(&patched[4..], b"###########\n");
    }

    #[test]
    fn does_not_touch_an_already_commented_line() {
        let cfg = b"# insmod luks\n";
        assert_eq!(patch_grub_cfg(cfg), cfg);
    }

    #[test]
    fn handles_a_final_line_with_no_trailing_newline() {
        let cfg = b"insmod cryptodisk";
        let patched = patch_grub_cfg(cfg);
        assert_eq!(patched, b"##################");
    }
}
