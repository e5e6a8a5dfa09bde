use clap::Parser;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    mlbox completions bash > ~/.bash_completion.d/mlbox\n\n\
                  Generate zsh completions:\n    mlbox completions zsh > ~/.zfunc/_mlbox\n\n\
                  Generate fish completions:\n    mlbox completions fish > ~/.config/fish/completions/mlbox.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    pub shell: String,
}
